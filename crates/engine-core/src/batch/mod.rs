pub mod chunker;
pub mod storage;

use uuid::Uuid;

/// Identifier shared by all chunk files of one stream's extraction run.
///
/// Combines the application name, the stream identity and a random run
/// token, so files from repeated or concurrent runs never collide.
pub fn sync_id(app: &str, stream: &str) -> String {
    format!("{app}--{stream}-{}", Uuid::new_v4())
}
