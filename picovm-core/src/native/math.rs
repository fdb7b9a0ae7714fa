//! `java/lang/Math`, integer methods only

use super::method::math;
use super::{require, Interpreter, NativeError, Value};

pub(super) fn invoke<V: Interpreter>(vm: &mut V, method: u8) -> Result<(), NativeError> {
    let result = match method {
        math::ABS => {
            require(vm, 1)?;
            vm.stack_pop_int().wrapping_abs()
        }
        math::MAX | math::MIN => {
            require(vm, 2)?;
            let b = vm.stack_pop_int();
            let a = vm.stack_pop_int();
            if method == math::MAX {
                a.max(b)
            } else {
                a.min(b)
            }
        }
        math::SQRT => {
            require(vm, 1)?;
            isqrt(vm.stack_pop_int())
        }
        _ => return Err(NativeError::UnknownMethod),
    };
    vm.stack_push(result);
    Ok(())
}

/// Floor of the square root; negative input yields 0
fn isqrt(value: i32) -> Value {
    if value <= 0 {
        return 0;
    }
    let n = value as u32;
    let mut root = 0u32;
    let mut bit = 1u32 << 30;
    while bit > n {
        bit >>= 2;
    }
    let mut rem = n;
    while bit != 0 {
        if rem >= root + bit {
            rem -= root + bit;
            root = (root >> 1) + bit;
        } else {
            root >>= 1;
        }
        bit >>= 2;
    }
    root as Value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(17), 4);
        assert_eq!(isqrt(i32::MAX), 46340);
        assert_eq!(isqrt(-9), 0);
    }
}
