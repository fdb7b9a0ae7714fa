//! Native method references
//!
//! The class-file converter resolves every call into a builtin class to a
//! 16-bit reference: class id in the high byte, method id in the low byte.

/// Two-level native method reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NativeRef(pub u16);

impl NativeRef {
    pub const fn new(class: u8, method: u8) -> Self {
        Self(((class as u16) << 8) | method as u16)
    }

    pub const fn class_id(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn method_id(self) -> u8 {
        self.0 as u8
    }
}

impl From<u16> for NativeRef {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

/// Builtin classes compiled into this build
///
/// Disabled class groups are absent from the enum, so their ids fail to
/// decode exactly like ids that never existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum NativeClass {
    /// `java/lang/Object`
    Object = 0,
    /// `java/io/PrintStream`
    #[cfg(feature = "stdio")]
    PrintStream = 1,
    /// `java/io/InputStream`
    #[cfg(feature = "stdio")]
    InputStream = 2,
    /// `java/lang/StringBuffer`
    #[cfg(feature = "stdio")]
    StringBuffer = 3,
    /// `java/lang/Math` (integer only)
    #[cfg(feature = "math")]
    Math = 4,
    /// `nanovm/util/Formatter`
    #[cfg(feature = "formatter")]
    Formatter = 5,
    /// Board information
    #[cfg(feature = "platform")]
    Board = 16,
    /// Port/bit digital I/O
    #[cfg(feature = "platform")]
    Gpio = 17,
    /// Tick timer
    #[cfg(feature = "platform")]
    Timer = 18,
}

impl NativeClass {
    /// Decode a class id, `None` if the class is not compiled in
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(NativeClass::Object),
            #[cfg(feature = "stdio")]
            1 => Some(NativeClass::PrintStream),
            #[cfg(feature = "stdio")]
            2 => Some(NativeClass::InputStream),
            #[cfg(feature = "stdio")]
            3 => Some(NativeClass::StringBuffer),
            #[cfg(feature = "math")]
            4 => Some(NativeClass::Math),
            #[cfg(feature = "formatter")]
            5 => Some(NativeClass::Formatter),
            #[cfg(feature = "platform")]
            16 => Some(NativeClass::Board),
            #[cfg(feature = "platform")]
            17 => Some(NativeClass::Gpio),
            #[cfg(feature = "platform")]
            18 => Some(NativeClass::Timer),
            _ => None,
        }
    }

    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Reference to `method` of this class
    pub const fn method(self, method: u8) -> NativeRef {
        NativeRef::new(self as u8, method)
    }
}

/// Method ids per class
pub mod method {
    pub mod object {
        /// `<init>()`, discards the receiver
        pub const INIT: u8 = 0;
    }

    pub mod print_stream {
        pub const PRINTLN_STRING: u8 = 1;
        pub const PRINTLN_INT: u8 = 2;
        pub const PRINT_STRING: u8 = 3;
        pub const PRINT_INT: u8 = 4;
        pub const PRINTLN_CHAR: u8 = 5;
        pub const PRINT_CHAR: u8 = 6;
    }

    pub mod input_stream {
        pub const AVAILABLE: u8 = 1;
        pub const READ: u8 = 2;
    }

    pub mod string_buffer {
        pub const INIT: u8 = 0;
        pub const INIT_STRING: u8 = 1;
        pub const APPEND_STRING: u8 = 2;
        pub const APPEND_INT: u8 = 3;
        pub const APPEND_CHAR: u8 = 4;
        pub const TO_STRING: u8 = 5;
    }

    pub mod math {
        pub const ABS: u8 = 1;
        pub const MAX: u8 = 2;
        pub const MIN: u8 = 3;
        pub const SQRT: u8 = 4;
    }

    pub mod formatter {
        pub const FORMAT: u8 = 1;
    }

    pub mod board {
        pub const GET_CLOCK: u8 = 1;
    }

    pub mod gpio {
        pub const SET_INPUT: u8 = 1;
        pub const SET_OUTPUT: u8 = 2;
        pub const SET_BIT: u8 = 3;
        pub const CLR_BIT: u8 = 4;
    }

    pub mod timer {
        pub const SET_SPEED: u8 = 1;
        pub const GET: u8 = 2;
        pub const WAIT: u8 = 3;
        pub const SET_PRESCALER: u8 = 4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_reference() {
        let reference = NativeRef(0x1103);
        assert_eq!(reference.class_id(), 0x11);
        assert_eq!(reference.method_id(), 0x03);
        assert_eq!(NativeRef::new(0x11, 0x03), reference);
    }

    #[test]
    fn test_object_always_present() {
        assert_eq!(NativeClass::from_id(0), Some(NativeClass::Object));
        assert_eq!(NativeClass::Object.method(method::object::INIT), NativeRef(0));
    }

    #[test]
    fn test_unknown_ids() {
        assert_eq!(NativeClass::from_id(6), None);
        assert_eq!(NativeClass::from_id(0xFF), None);
    }

    #[test]
    fn test_round_trip_enabled_classes() {
        for id in 0..=u8::MAX {
            if let Some(class) = NativeClass::from_id(id) {
                assert_eq!(class.id(), id);
            }
        }
    }

    #[cfg(feature = "stdio")]
    #[test]
    fn test_stdio_classes() {
        assert_eq!(NativeClass::from_id(1), Some(NativeClass::PrintStream));
        assert_eq!(NativeClass::from_id(3), Some(NativeClass::StringBuffer));
    }

    #[cfg(not(feature = "platform"))]
    #[test]
    fn test_platform_compiled_out() {
        assert_eq!(NativeClass::from_id(16), None);
        assert_eq!(NativeClass::from_id(18), None);
    }
}
