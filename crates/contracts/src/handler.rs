//! LineHandler trait - Stream Source output interface
//!
//! The source delivers every newline-terminated line to one handler.

use crate::ContractError;

/// Consumer of raw feed lines
///
/// An error returned here is logged by the source; the connection stays open.
#[trait_variant::make(LineHandler: Send)]
pub trait LocalLineHandler {
    /// Handle one line (terminator and trailing `\r` already stripped)
    async fn handle_line(&mut self, line: String) -> Result<(), ContractError>;
}
