//! End-to-end tests over a synthetic on-disk database.
//!
//! The fixture builder writes byte-exact item files, data files and a names
//! file into a temporary directory, then the tests drive the public API the
//! way a migration pipeline would.

use std::path::Path;
use std::sync::Arc;

use sourcesafe::db::{Database, DatabaseConfig};
use sourcesafe::encoding::Encoding;
use sourcesafe::history::{ActionKind, ChangesetHistory};
use sourcesafe::item::ItemFileType;
use sourcesafe::record::{crc16_fold, PhysicalName};
use tempfile::TempDir;

// ---------------------------------------------------------------- fixtures

fn fixed(bytes: &[u8], size: usize) -> Vec<u8> {
    assert!(bytes.len() <= size, "field overflow");
    let mut field = vec![0u8; size];
    field[..bytes.len()].copy_from_slice(bytes);
    field
}

fn name40(flags: u16, short: &[u8], name_file_offset: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(40);
    bytes.extend_from_slice(&flags.to_le_bytes());
    bytes.extend_from_slice(&fixed(short, 34));
    bytes.extend_from_slice(&name_file_offset.to_le_bytes());
    bytes
}

/// Frame a payload as a record. `crc` overrides the computed fold (comment
/// records store whatever VSS left there; usually zero).
fn record(signature: [u8; 2], crc: Option<u16>, payload: &[u8]) -> Vec<u8> {
    let crc = crc.unwrap_or_else(|| crc16_fold(payload));
    let mut bytes = Vec::with_capacity(8 + payload.len());
    bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&signature);
    bytes.extend_from_slice(&crc.to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

/// The 88-byte base of a revision record.
#[allow(clippy::too_many_arguments)]
fn revision_base(
    prev_rev_offset: u32,
    action: u16,
    revision_num: u16,
    timestamp: u32,
    user: &[u8],
    label: &[u8],
    comment_offset: u32,
    comment_length: u16,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(88);
    bytes.extend_from_slice(&prev_rev_offset.to_le_bytes());
    bytes.extend_from_slice(&action.to_le_bytes());
    bytes.extend_from_slice(&revision_num.to_le_bytes());
    bytes.extend_from_slice(&timestamp.to_le_bytes());
    bytes.extend_from_slice(&fixed(user, 32));
    bytes.extend_from_slice(&fixed(label, 32));
    bytes.extend_from_slice(&comment_offset.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&comment_length.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes
}

fn delta_payload(ops: &[(u16, u32, u32)], log: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for &(op, size, offset) in ops {
        bytes.extend_from_slice(&op.to_le_bytes());
        bytes.extend_from_slice(&size.to_le_bytes());
        bytes.extend_from_slice(&offset.to_le_bytes());
    }
    bytes.extend_from_slice(log);
    bytes
}

const FILE_HEADER_PAYLOAD_LEN: usize = 136;
const PROJECT_HEADER_PAYLOAD_LEN: usize = 356;

/// Accumulates the record stream of one item file, tracking absolute
/// offsets, then assembles preamble + header record + stream.
struct ItemFileBuilder {
    file_type: ItemFileType,
    header_payload_len: usize,
    stream: Vec<u8>,
}

impl ItemFileBuilder {
    fn new(file_type: ItemFileType) -> Self {
        let header_payload_len = match file_type {
            ItemFileType::File => FILE_HEADER_PAYLOAD_LEN,
            ItemFileType::Project => PROJECT_HEADER_PAYLOAD_LEN,
        };
        Self {
            file_type,
            header_payload_len,
            stream: Vec::new(),
        }
    }

    /// Absolute offset the next appended record will land at.
    fn next_offset(&self) -> u32 {
        (52 + 8 + self.header_payload_len + self.stream.len()) as u32
    }

    fn append(&mut self, record: Vec<u8>) -> u32 {
        let offset = self.next_offset();
        self.stream.extend_from_slice(&record);
        offset
    }

    fn eof_offset(&self) -> u32 {
        self.next_offset()
    }

    fn finish(self, header_payload: Vec<u8>) -> Vec<u8> {
        assert_eq!(header_payload.len(), self.header_payload_len);
        let mut data = vec![0u8; 52];
        data[..21].copy_from_slice(b"SourceSafe@Microsoft\x00");
        data[32..34].copy_from_slice(&(self.file_type as i16).to_le_bytes());
        data[34..36].copy_from_slice(&6i16.to_le_bytes());
        data.extend_from_slice(&record(*b"DH", None, &header_payload));
        data.extend_from_slice(&self.stream);
        data
    }
}

/// The shared head of both header payload layouts.
#[allow(clippy::too_many_arguments)]
fn header_common(
    item_type: ItemFileType,
    num_revisions: u16,
    name: &[u8],
    first_revision: u16,
    data_ext: &[u8; 2],
    first_revision_offset: i32,
    last_revision_offset: i32,
    eof_offset: i32,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(80);
    bytes.extend_from_slice(&(item_type as i16).to_le_bytes());
    bytes.extend_from_slice(&num_revisions.to_le_bytes());
    bytes.extend_from_slice(&name40(
        if item_type == ItemFileType::Project { 1 } else { 0 },
        name,
        0,
    ));
    bytes.extend_from_slice(&first_revision.to_le_bytes());
    bytes.extend_from_slice(data_ext);
    bytes.extend_from_slice(&first_revision_offset.to_le_bytes());
    bytes.extend_from_slice(&last_revision_offset.to_le_bytes());
    bytes.extend_from_slice(&eof_offset.to_le_bytes());
    bytes.extend_from_slice(&0i32.to_le_bytes()); // rights_offset
    bytes.extend_from_slice(&[0u8; 16]); // filler
    bytes
}

struct FileHeaderSpec {
    branch_file: Vec<u8>,
    branch_offset: i32,
    project_offset: i32,
    branch_count: u16,
    project_count: u16,
}

impl Default for FileHeaderSpec {
    fn default() -> Self {
        Self {
            branch_file: Vec::new(),
            branch_offset: 0,
            project_offset: 0,
            branch_count: 0,
            project_count: 0,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn file_header_payload(
    num_revisions: u16,
    name: &[u8],
    first_revision: u16,
    first_revision_offset: i32,
    last_revision_offset: i32,
    eof_offset: i32,
    spec: FileHeaderSpec,
) -> Vec<u8> {
    let mut bytes = header_common(
        ItemFileType::File,
        num_revisions,
        name,
        first_revision,
        b".A",
        first_revision_offset,
        last_revision_offset,
        eof_offset,
    );
    bytes.extend_from_slice(&0u16.to_le_bytes()); // flags
    bytes.extend_from_slice(&fixed(&spec.branch_file, 10));
    bytes.extend_from_slice(&spec.branch_offset.to_le_bytes());
    bytes.extend_from_slice(&spec.project_offset.to_le_bytes());
    bytes.extend_from_slice(&spec.branch_count.to_le_bytes());
    bytes.extend_from_slice(&spec.project_count.to_le_bytes());
    bytes.extend_from_slice(&0i32.to_le_bytes()); // first checkout
    bytes.extend_from_slice(&0i32.to_le_bytes()); // last checkout
    bytes.extend_from_slice(&0u32.to_le_bytes()); // data crc
    bytes.extend_from_slice(&[0u8; 8]); // filler
    bytes.extend_from_slice(&0u32.to_le_bytes()); // last rev time
    bytes.extend_from_slice(&0u32.to_le_bytes()); // modification time
    bytes.extend_from_slice(&0u32.to_le_bytes()); // creation time
    assert_eq!(bytes.len(), FILE_HEADER_PAYLOAD_LEN);
    bytes
}

fn project_header_payload(
    num_revisions: u16,
    name: &[u8],
    first_revision_offset: i32,
    last_revision_offset: i32,
    eof_offset: i32,
    total_items: i16,
) -> Vec<u8> {
    let mut bytes = header_common(
        ItemFileType::Project,
        num_revisions,
        name,
        1,
        b".A",
        first_revision_offset,
        last_revision_offset,
        eof_offset,
    );
    bytes.extend_from_slice(&fixed(b"$", 260)); // parent project
    bytes.extend_from_slice(&fixed(b"", 12)); // parent file
    bytes.extend_from_slice(&total_items.to_le_bytes());
    bytes.extend_from_slice(&0i16.to_le_bytes()); // subprojects
    assert_eq!(bytes.len(), PROJECT_HEADER_PAYLOAD_LEN);
    bytes
}

fn project_entry(item_type: ItemFileType, flags: u16, name: &[u8], physical: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(56);
    payload.extend_from_slice(&(item_type as i16).to_le_bytes());
    payload.extend_from_slice(&flags.to_le_bytes());
    payload.extend_from_slice(&name40(
        if item_type == ItemFileType::Project { 1 } else { 0 },
        name,
        0,
    ));
    payload.extend_from_slice(&0i16.to_le_bytes()); // pinned version
    payload.extend_from_slice(&fixed(physical, 10));
    record(*b"JP", None, &payload)
}

fn common_revision_payload(base: Vec<u8>, name: &[u8], physical: &[u8]) -> Vec<u8> {
    let mut payload = base;
    payload.extend_from_slice(&name40(0, name, 0));
    payload.extend_from_slice(&fixed(physical, 10));
    payload
}

fn write_bucketed(data_dir: &Path, physical: &str, bytes: &[u8]) {
    let bucket = data_dir.join(physical.chars().next().unwrap().to_ascii_lowercase().to_string());
    std::fs::create_dir_all(&bucket).unwrap();
    std::fs::write(bucket.join(physical), bytes).unwrap();
}

/// Minimal names file: a header record and nothing else.
fn empty_names_file() -> Vec<u8> {
    let mut payload = vec![0u8; 16];
    payload.extend_from_slice(&28u32.to_le_bytes()); // eof right after this record
    record(*b"HN", None, &payload)
}

/// File BAAAAAAA, "hello.c": CreateFile + one checkin whose delta is the
/// identity (scenario S1), with a commented checkin, a bogus-CRC comment
/// (scenario S5) and two project backlinks (scenario S6).
fn build_hello_item() -> Vec<u8> {
    let mut builder = ItemFileBuilder::new(ItemFileType::File);

    // comment for the checkin; VSS stores junk CRCs on comments
    let comment = b"first change\x00";
    let comment_offset = builder.append(record(*b"MC", Some(0xFFFF), comment));

    // backlinks: header points at the newest, list walks back to zero
    let backlink1 = {
        let mut payload = 0u32.to_le_bytes().to_vec();
        payload.extend_from_slice(&fixed(b"AAAAAAAA", 12));
        builder.append(record(*b"RP", None, &payload))
    };
    let backlink2 = {
        let mut payload = backlink1.to_le_bytes().to_vec();
        payload.extend_from_slice(&fixed(b"EAAAAAAA", 12));
        builder.append(record(*b"RP", None, &payload))
    };

    // identity delta: the previous revision equals the successor
    let delta_offset = builder.append(record(
        *b"FD",
        None,
        &delta_payload(&[(1, 11, 0), (2, 0, 0)], b""),
    ));

    let rev1 = builder.append(record(
        *b"EL",
        None,
        &common_revision_payload(
            revision_base(0, 16, 1, 100, b"alice", b"", 0, 0),
            b"hello.c",
            b"BAAAAAAA",
        ),
    ));
    let rev2 = {
        let mut payload = revision_base(rev1, 17, 2, 200, b"alice", b"", comment_offset, 13);
        payload.extend_from_slice(&delta_offset.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&fixed(b"$/", 260));
        builder.append(record(*b"EL", None, &payload))
    };

    let eof = builder.eof_offset();
    builder.finish(file_header_payload(
        2,
        b"hello.c",
        1,
        rev1 as i32,
        rev2 as i32,
        eof as i32,
        FileHeaderSpec {
            project_offset: backlink2 as i32,
            project_count: 2,
            ..Default::default()
        },
    ))
}

/// File QAAAAAAA, "util.c": three revisions with contents "one", "two",
/// "three" reconstructed through two deltas (the parent of scenario S4).
fn build_branch_parent_item() -> Vec<u8> {
    let mut builder = ItemFileBuilder::new(ItemFileType::File);

    let delta_to_one = builder.append(record(
        *b"FD",
        None,
        &delta_payload(&[(0, 3, 0), (2, 0, 0)], b"one"),
    ));
    let delta_to_two = builder.append(record(
        *b"FD",
        None,
        &delta_payload(&[(0, 3, 0), (2, 0, 0)], b"two"),
    ));

    let rev1 = builder.append(record(
        *b"EL",
        None,
        &common_revision_payload(
            revision_base(0, 16, 1, 110, b"bob", b"", 0, 0),
            b"util.c",
            b"QAAAAAAA",
        ),
    ));
    let rev2 = {
        let mut payload = revision_base(rev1, 17, 2, 120, b"bob", b"", 0, 0);
        payload.extend_from_slice(&delta_to_one.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&fixed(b"$/", 260));
        builder.append(record(*b"EL", None, &payload))
    };
    let rev3 = {
        let mut payload = revision_base(rev2, 17, 3, 130, b"bob", b"", 0, 0);
        payload.extend_from_slice(&delta_to_two.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&fixed(b"$/", 260));
        builder.append(record(*b"EL", None, &payload))
    };

    let eof = builder.eof_offset();
    builder.finish(file_header_payload(
        3,
        b"util.c",
        1,
        rev1 as i32,
        rev3 as i32,
        eof as i32,
        FileHeaderSpec::default(),
    ))
}

/// File PAAAAAAA, "util.c" branched from QAAAAAAA at version 3
/// (scenario S4): the only local revision is the CreateBranch.
fn build_branch_child_item() -> Vec<u8> {
    let mut builder = ItemFileBuilder::new(ItemFileType::File);

    let rev3 = {
        let mut payload = revision_base(0, 19, 3, 140, b"bob", b"", 0, 0);
        payload.extend_from_slice(&name40(0, b"util.c", 0));
        payload.extend_from_slice(&fixed(b"PAAAAAAA", 10));
        payload.extend_from_slice(&fixed(b"QAAAAAAA", 10));
        builder.append(record(*b"EL", None, &payload))
    };

    let eof = builder.eof_offset();
    builder.finish(file_header_payload(
        3,
        b"util.c",
        3,
        rev3 as i32,
        rev3 as i32,
        eof as i32,
        FileHeaderSpec {
            branch_file: b"QAAAAAAA".to_vec(),
            ..Default::default()
        },
    ))
}

/// Root project AAAAAAAA: add three files, delete and recover one
/// (scenario S2), rename another across the sort boundary (scenario S3).
fn build_root_project_item() -> Vec<u8> {
    let mut builder = ItemFileBuilder::new(ItemFileType::Project);

    let mut prev = 0u32;
    let mut revisions = Vec::new();
    let specs: [(u16, &[u8], &[u8]); 6] = [
        (1, b"$", b"AAAAAAAA"),         // 1: CreateProject (itself)
        (3, b"hello.c", b"BAAAAAAA"),   // 2: AddFile
        (3, b"apple.c", b"CAAAAAAA"),   // 3: AddFile
        (7, b"hello.c", b"BAAAAAAA"),   // 4: DeleteFile
        (9, b"hello.c", b"BAAAAAAA"),   // 5: RecoverFile
        (11, b"", b""),                 // 6: RenameFile (built below)
    ];
    for (index, (action, name, physical)) in specs.iter().enumerate() {
        let num = (index + 1) as u16;
        let timestamp = 1_000 + u32::from(num) * 10;
        let payload = if *action == 11 {
            // apple.c -> zebra.c, physical name unchanged
            let mut payload = revision_base(prev, 11, num, timestamp, b"carol", b"", 0, 0);
            payload.extend_from_slice(&name40(0, b"zebra.c", 0));
            payload.extend_from_slice(&name40(0, b"apple.c", 0));
            payload.extend_from_slice(&fixed(b"CAAAAAAA", 10));
            payload
        } else {
            let flags = if *action == 1 { 1 } else { 0 };
            let mut payload = revision_base(prev, *action, num, timestamp, b"carol", b"", 0, 0);
            payload.extend_from_slice(&name40(flags, name, 0));
            payload.extend_from_slice(&fixed(physical, 10));
            payload
        };
        prev = builder.append(record(*b"EL", None, &payload));
        revisions.push(prev);
    }

    let eof = builder.eof_offset();
    builder.finish(project_header_payload(
        6,
        b"$",
        revisions[0] as i32,
        *revisions.last().unwrap() as i32,
        eof as i32,
        3,
    ))
}

/// Current children of the root project, as its data file lists them.
fn build_root_entries() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&project_entry(
        ItemFileType::File,
        0,
        b"hello.c",
        b"BAAAAAAA",
    ));
    data.extend_from_slice(&project_entry(
        ItemFileType::File,
        0,
        b"zebra.c",
        b"CAAAAAAA",
    ));
    data.extend_from_slice(&project_entry(
        ItemFileType::File,
        0,
        b"util.c",
        b"PAAAAAAA",
    ));
    data
}

/// Write the whole synthetic database and open it.
fn open_fixture() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("srcsafe.ini"),
        "; fixture database\nData_Path = data\n",
    )
    .unwrap();

    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("names.dat"), empty_names_file()).unwrap();

    write_bucketed(&data_dir, "AAAAAAAA", &build_root_project_item());
    write_bucketed(&data_dir, "AAAAAAAA.A", &build_root_entries());
    write_bucketed(&data_dir, "BAAAAAAA", &build_hello_item());
    write_bucketed(&data_dir, "BAAAAAAA.A", b"hello world");
    write_bucketed(&data_dir, "QAAAAAAA", &build_branch_parent_item());
    write_bucketed(&data_dir, "QAAAAAAA.A", b"three");
    write_bucketed(&data_dir, "PAAAAAAA", &build_branch_child_item());
    write_bucketed(&data_dir, "PAAAAAAA.A", b"three");

    let db = Database::open_with_config(
        DatabaseConfig::new(dir.path()).encoding(Encoding::Utf8),
    )
    .unwrap();
    (dir, db)
}

// ------------------------------------------------------------------ tests

#[test]
fn test_open_root_project_tree() {
    let (_dir, db) = open_fixture();
    let root = db.open_root_project(true).unwrap();

    assert_eq!(root.logical_name, "$");
    assert_eq!(root.children.len(), 3);
    assert!(root.get_item_by_logical_name("hello.c").is_some());
    assert!(root.get_item_by_logical_name("zebra.c").is_some());
    assert!(root.get_item_by_logical_name("missing.c").is_none());
}

#[test]
fn test_identity_delta_round_trip() {
    // S1: one checkin with a WriteSuccessor-everything delta
    let (_dir, db) = open_fixture();
    let file = db.open_file_item(&PhysicalName::new("BAAAAAAA")).unwrap();

    let rev2 = file.revision(&db, 2).unwrap();
    assert_eq!(rev2.content.as_deref(), Some(&b"hello world"[..]));
    assert_eq!(rev2.comment.as_deref(), Some("first change"));

    let rev1 = file.revision(&db, 1).unwrap();
    assert_eq!(rev1.content.as_deref(), Some(&b"hello world"[..]));
}

#[test]
fn test_delta_chain_reconstruction() {
    let (_dir, db) = open_fixture();
    let file = db.open_file_item(&PhysicalName::new("QAAAAAAA")).unwrap();

    assert_eq!(file.revision(&db, 3).unwrap().content.as_deref(), Some(&b"three"[..]));
    assert_eq!(file.revision(&db, 2).unwrap().content.as_deref(), Some(&b"two"[..]));
    assert_eq!(file.revision(&db, 1).unwrap().content.as_deref(), Some(&b"one"[..]));
}

#[test]
fn test_branch_delegates_to_parent() {
    // S4: P branched from Q at version 3; P.revision(2) resolves via Q
    let (_dir, db) = open_fixture();
    let file = db.open_file_item(&PhysicalName::new("PAAAAAAA")).unwrap();

    assert_eq!(file.first_revision(), 3);
    assert_eq!(file.revision(&db, 3).unwrap().content.as_deref(), Some(&b"three"[..]));
    assert_eq!(file.revision(&db, 2).unwrap().content.as_deref(), Some(&b"two"[..]));
    assert_eq!(file.revision(&db, 1).unwrap().content.as_deref(), Some(&b"one"[..]));

    assert!(file.revision(&db, 4).is_err());
    assert!(file.revision(&db, 0).is_err());
}

#[test]
fn test_directory_state_fold() {
    // S2 + S3 against the root project's revision stream
    let (_dir, db) = open_fixture();
    let project = db.open_project_item(&PhysicalName::new("AAAAAAAA")).unwrap();
    let history = project.history(&db).unwrap();

    assert_eq!(history.revisions.len(), 6);
    for revision in &history.revisions {
        assert!(revision.errors.is_empty(), "{:?}", revision.errors);
    }

    // delete (rev 4) and recover (rev 5) resolved the same child
    assert!(history.revisions[3].item_index.is_some());
    assert_eq!(
        history.revisions[3].item_index,
        history.revisions[4].item_index
    );

    // final live children sorted by indexing name; zebra kept its physical
    let names: Vec<&str> = history
        .state
        .live_entries()
        .map(|e| e.logical_name.as_str())
        .collect();
    assert_eq!(names, vec!["hello.c", "zebra.c"]);
    let zebra = history.state.live_entries().last().unwrap();
    assert_eq!(zebra.physical_name.as_str(), "CAAAAAAA");
    assert!(history.state.is_sorted());
}

#[test]
fn test_project_backlinks_in_link_order() {
    // S6: two containing projects enumerated newest-first to the zero link
    let (_dir, db) = open_fixture();
    let file = db.open_file_item(&PhysicalName::new("BAAAAAAA")).unwrap();

    let backlinks = file.project_backlinks().unwrap();
    let names: Vec<&str> = backlinks.iter().map(|b| b.project_file.as_str()).collect();
    assert_eq!(names, vec!["EAAAAAAA", "AAAAAAAA"]);
}

#[test]
fn test_item_file_cache_is_shared() {
    let (_dir, db) = open_fixture();
    let first = db.open_file_item(&PhysicalName::new("BAAAAAAA")).unwrap();
    let second = db.open_file_item(&PhysicalName::new("BAAAAAAA")).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_changeset_history() {
    let (_dir, db) = open_fixture();
    let root = db.open_root_project(true).unwrap();
    let history = ChangesetHistory::build(&db, &root).unwrap();

    assert!(!history.is_empty());

    // chronological and grouped by (timestamp, author)
    let changesets = history.changesets();
    for pair in changesets.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
    for changeset in changesets {
        for action in &changeset.actions {
            assert_eq!(action.timestamp, changeset.timestamp);
            assert_eq!(action.user, changeset.author);
        }
    }

    // the checkin carries its comment and content
    let checkin = changesets
        .iter()
        .flat_map(|c| c.actions.iter())
        .find(|a| matches!(a.kind, ActionKind::Checkin) && a.pathname == "$/hello.c")
        .expect("checkin action for $/hello.c");
    assert_eq!(checkin.content.as_deref(), Some(&b"hello world"[..]));
    assert_eq!(checkin.comment.as_deref(), Some("first change"));

    // the rename kept the describable original name
    let rename = changesets
        .iter()
        .flat_map(|c| c.actions.iter())
        .find(|a| matches!(a.kind, ActionKind::RenameFile { .. }))
        .expect("rename action");
    assert_eq!(rename.to_string(), "Rename file $/apple.c to $/zebra.c");
}

#[test]
fn test_dump_runs_clean() {
    let (_dir, db) = open_fixture();
    let root = db.open_root_project(true).unwrap();

    let mut out = Vec::new();
    sourcesafe::dump::dump_database(
        &db,
        &root,
        &mut out,
        sourcesafe::dump::VerboseFlags::default()
            .with(sourcesafe::dump::VerboseFlags::PROJECT_TREE)
            .with(sourcesafe::dump::VerboseFlags::RECORDS)
            .with(sourcesafe::dump::VerboseFlags::REVISIONS),
    )
    .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Project $/"));
    assert!(text.contains("hello.c"));
    assert!(text.contains("RECORD:"));
}
