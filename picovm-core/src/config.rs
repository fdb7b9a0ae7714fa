//! Compile-time feature report
//!
//! Interpreter toggles and native class groups are Cargo features of this
//! crate. The loader compares an image's requirements against [`FEATURES`]
//! before running it.

/// Features compiled into this build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VmFeatures {
    pub array: bool,
    pub switch: bool,
    pub inheritance: bool,
    pub stdio: bool,
    pub math: bool,
    pub formatter: bool,
    pub platform: bool,
    pub stack_check: bool,
}

pub const FEATURES: VmFeatures = VmFeatures {
    array: cfg!(feature = "array"),
    switch: cfg!(feature = "switch"),
    inheritance: cfg!(feature = "inheritance"),
    stdio: cfg!(feature = "stdio"),
    math: cfg!(feature = "math"),
    formatter: cfg!(feature = "formatter"),
    platform: cfg!(feature = "platform"),
    stack_check: cfg!(feature = "stack-check"),
};

impl VmFeatures {
    pub const ARRAY: u8 = 1 << 0;
    pub const SWITCH: u8 = 1 << 1;
    pub const INHERITANCE: u8 = 1 << 2;
    pub const STDIO: u8 = 1 << 3;
    pub const MATH: u8 = 1 << 4;
    pub const FORMATTER: u8 = 1 << 5;
    pub const PLATFORM: u8 = 1 << 6;
    pub const STACK_CHECK: u8 = 1 << 7;

    /// Pack into one flag byte, bit 0 = `array` through bit 7 = `stack_check`
    pub const fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.array {
            bits |= Self::ARRAY;
        }
        if self.switch {
            bits |= Self::SWITCH;
        }
        if self.inheritance {
            bits |= Self::INHERITANCE;
        }
        if self.stdio {
            bits |= Self::STDIO;
        }
        if self.math {
            bits |= Self::MATH;
        }
        if self.formatter {
            bits |= Self::FORMATTER;
        }
        if self.platform {
            bits |= Self::PLATFORM;
        }
        if self.stack_check {
            bits |= Self::STACK_CHECK;
        }
        bits
    }

    /// Check that every feature flagged in `required` is compiled in
    ///
    /// `stack_check` only changes how natives fail, so an image never
    /// requires it.
    pub const fn supports(&self, required: u8) -> bool {
        let required = required & !Self::STACK_CHECK;
        required & !self.bits() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_match_cfg() {
        let bits = FEATURES.bits();
        assert_eq!(bits & VmFeatures::STDIO != 0, cfg!(feature = "stdio"));
        assert_eq!(bits & VmFeatures::MATH != 0, cfg!(feature = "math"));
        assert_eq!(
            bits & VmFeatures::STACK_CHECK != 0,
            cfg!(feature = "stack-check")
        );
    }

    #[test]
    fn test_supports() {
        let features = VmFeatures {
            array: true,
            switch: false,
            inheritance: false,
            stdio: true,
            math: false,
            formatter: false,
            platform: false,
            stack_check: false,
        };
        assert!(features.supports(VmFeatures::ARRAY | VmFeatures::STDIO));
        assert!(features.supports(VmFeatures::STACK_CHECK));
        assert!(!features.supports(VmFeatures::MATH));
        assert!(FEATURES.supports(FEATURES.bits()));
    }
}
