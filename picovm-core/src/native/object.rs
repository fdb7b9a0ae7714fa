//! `java/lang/Object`

use super::method::object;
use super::{require, Interpreter, NativeError};

pub(super) fn invoke<V: Interpreter>(vm: &mut V, method: u8) -> Result<(), NativeError> {
    match method {
        object::INIT => {
            // Nothing to construct, drop the receiver
            require(vm, 1)?;
            vm.stack_pop();
            Ok(())
        }
        _ => Err(NativeError::UnknownMethod),
    }
}
