use reclaim::daemon::run_with_input;
use reclaim_engine::Config;
use reclaim_nbt::{NbtFile, Tag};
use reclaim_region::RegionBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_test::io::Builder;
use uuid::Uuid;

/// A server directory with one world holding one fully generated region.
fn server_dir() -> PathBuf {
    let root = std::env::temp_dir().join(format!("reclaim-daemon-{}", Uuid::new_v4()));
    let region_folder = root.join("world").join("region");
    std::fs::create_dir_all(&region_folder).unwrap();

    let mut level = HashMap::new();
    level.insert("Status".to_owned(), Tag::String("minecraft:full".to_owned()));
    RegionBuilder::filled(&NbtFile::new("", Tag::Compound(level)))
        .unwrap()
        .write(&region_folder.join("r.0.0.mca"))
        .unwrap();
    root
}

fn write_config(root: &Path, config: Config) -> PathBuf {
    let path = root.join("reclaim.json");
    config.save(&path).unwrap();
    path
}

fn region(root: &Path) -> PathBuf {
    root.join("world").join("region").join("r.0.0.mca")
}

#[tokio::test]
async fn test_console_flag_then_stop() {
    let root = server_dir();
    let path = write_config(
        &root,
        Config {
            worlds: vec!["world".to_owned()],
            ..Config::default()
        },
    );

    let input = Builder::new()
        .read(b"flag world 3 4\nstatus\nnonsense\nstop\n")
        .build();
    run_with_input(&path, input).await.unwrap();

    // A fresh world gathers flags first, and the gate went back into the file
    let config = Config::load(&path).unwrap();
    assert!(config.reset_gate("world").is_some());
    assert_eq!(config.data_folder, PathBuf::from("reclaim-data"));
    assert!(region(&root).exists());

    let flags = std::fs::read_to_string(root.join("reclaim-data").join("world").join("r.0.0.json"))
        .unwrap();
    assert!(flags.contains("\"3,4\":\"eternal\""));
}

#[tokio::test]
async fn test_unvisited_region_goes_without_flagging() {
    let root = server_dir();
    let path = write_config(
        &root,
        Config {
            worlds: vec!["world".to_owned()],
            flag_duration_days: 0.0,
            chunks_per_deletion: 1024,
            ticks_per_deletion: 1,
            ..Config::default()
        },
    );

    let input = Builder::new()
        .wait(Duration::from_millis(500))
        .read(b"stop\n")
        .build();
    run_with_input(&path, input).await.unwrap();

    assert!(!region(&root).exists());
}

#[tokio::test]
async fn test_malformed_config_is_an_error() {
    let root = server_dir();
    let path = root.join("reclaim.json");
    std::fs::write(&path, b"{\"worlds\": 3}").unwrap();

    let input = Builder::new().build();
    assert!(run_with_input(&path, input).await.is_err());
    assert!(region(&root).exists());
}
