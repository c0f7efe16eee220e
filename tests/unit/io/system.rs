use super::*;
use crate::io::memory::MemoryPlugin;

#[test]
fn dispatches_by_extension_case_insensitively() {
    let io = IoSystem::with_defaults();
    assert_eq!(io.plugin_for(Path::new("a/b.PNG")).unwrap().name(), "Sequence");
    assert!(io.plugin_for(Path::new("movie.mov")).is_none());
    assert!(io.plugin_for(Path::new("no_extension")).is_none());
    assert!(io.extensions().contains(&"exr".to_string()));
}

#[test]
fn defaults_do_not_open_procedural_media() {
    let io = IoSystem::with_defaults();
    assert!(io.plugin_for(Path::new("clip.mem")).is_none());
    assert!(!io.extensions().contains(&"mem".to_string()));
    assert!(matches!(
        io.read(Path::new("/does/not/exist.mem"), &IoOptions::new()),
        Err(ReeltimeError::Io(_))
    ));
}

#[test]
fn unknown_extension_is_an_io_error() {
    let io = IoSystem::new();
    assert!(matches!(
        io.read(Path::new("clip.mem"), &IoOptions::new()),
        Err(ReeltimeError::Io(_))
    ));
}

#[test]
fn later_registration_wins() {
    let mut io = IoSystem::with_defaults();
    let first = MemoryPlugin::new().with_size(4, 4);
    let custom = MemoryPlugin::new().with_size(2, 2);
    io.register(Arc::new(first.clone()));
    io.register(Arc::new(custom.clone()));
    assert_eq!(io.plugin_for(Path::new("clip.mem")).unwrap().name(), "Memory");
    let reader = io.read(Path::new("x.mem"), &IoOptions::new()).unwrap();
    assert_eq!(first.opened_count(), 0);
    assert_eq!(custom.opened_count(), 1);
    assert_eq!(reader.info().wait().unwrap().video[0].width, 2);
}
