/*!
 * Common test utilities for the subalign test suite
 */

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use tempfile::TempDir;

use subalign::app_config::Config;
use subalign::subtitle::Segment;

// Re-export the mock translators module
pub mod mock_translators;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &PathBuf, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &PathBuf, filename: &str) -> Result<PathBuf> {
    let content = r#"1
00:00:01,000 --> 00:00:02,400
so today we are going to

2
00:00:02,600 --> 00:00:04,000
talk about neural networks

3
00:00:04,500 --> 00:00:06,500
They power most modern translation systems.

4
00:00:07,000 --> 00:00:09,000
Let's start with a simple example.
"#;
    create_test_file(dir, filename, content)
}

/// Builds raw recognizer-style fragments for segmentation tests
pub fn create_test_fragments() -> Vec<Segment> {
    vec![
        Segment::new(1.0, 2.4, "so today we are going to"),
        Segment::new(2.6, 4.0, "talk about neural networks"),
        Segment::new(4.5, 6.5, "They power most modern translation systems."),
        Segment::new(7.0, 9.0, "Let's start with a simple example."),
    ]
}

/// Builds a config whose lexicon lives under the given directory
///
/// Keeps tests hermetic: nothing is read from or written to the user
/// config directory.
pub fn create_test_config(lexicon_dir: &PathBuf) -> Config {
    let mut config = Config::default();
    config.lexicon.directory = Some(lexicon_dir.clone());
    config.output_dir = lexicon_dir.clone();
    config
}
