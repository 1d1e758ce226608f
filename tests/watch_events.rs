// tests/watch_events.rs

use std::path::PathBuf;

use notify::event::{
    AccessKind, CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind, RenameMode,
};
use notify::{Event, EventKind};

use rulewatch::watch::watcher::classify;
use rulewatch::watch::ChangeKind;

fn event(kind: EventKind, paths: &[&str]) -> Event {
    paths
        .iter()
        .fold(Event::new(kind), |ev, p| ev.add_path(PathBuf::from(p)))
}

#[test]
fn create_modify_remove_map_to_change_kinds() {
    assert_eq!(
        classify(&event(EventKind::Create(CreateKind::File), &["/p/a"])),
        vec![(PathBuf::from("/p/a"), ChangeKind::Added)]
    );
    assert_eq!(
        classify(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/p/a"]
        )),
        vec![(PathBuf::from("/p/a"), ChangeKind::Changed)]
    );
    assert_eq!(
        classify(&event(EventKind::Remove(RemoveKind::File), &["/p/a"])),
        vec![(PathBuf::from("/p/a"), ChangeKind::Removed)]
    );
}

#[test]
fn renames_split_into_remove_and_add() {
    assert_eq!(
        classify(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/p/old", "/p/new"]
        )),
        vec![
            (PathBuf::from("/p/old"), ChangeKind::Removed),
            (PathBuf::from("/p/new"), ChangeKind::Added),
        ]
    );
    assert_eq!(
        classify(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/p/new"]
        )),
        vec![(PathBuf::from("/p/new"), ChangeKind::Added)]
    );
}

#[test]
fn access_and_metadata_events_are_ignored() {
    assert!(classify(&event(EventKind::Access(AccessKind::Any), &["/p/a"])).is_empty());
    assert!(classify(&event(
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
        &["/p/a"]
    ))
    .is_empty());
    assert!(classify(&event(EventKind::Other, &["/p/a"])).is_empty());
}
