/// Schema-less node tree dump command.
pub mod dump;
/// Document-level statistics command.
pub mod info;

mod util;
