use linkfs::{
    AllocationPolicy, BlockStorage, BlockStore, ChainReader, DiskConfig, FileBlockEmulator,
    FileBlockEmulatorBuilder, LinkFsError, LinkedDisk, MemoryBlockDevice, EOF_POINTER,
    RECORD_TRAILER_BYTES,
};
use std::collections::HashSet;
use tempfile::NamedTempFile;

fn config(blocks: usize, capacity: usize, policy: AllocationPolicy) -> DiskConfig {
    DiskConfig::builder()
        .with_total_blocks(blocks)
        .with_payload_capacity(capacity)
        .with_policy(policy)
        .build()
        .unwrap()
}

fn memory_disk(blocks: usize, capacity: usize, policy: AllocationPolicy) -> LinkedDisk<MemoryBlockDevice> {
    let config = config(blocks, capacity, policy);
    let dev = MemoryBlockDevice::new(blocks, config.record_bytes());
    LinkedDisk::format(dev, config).unwrap()
}

#[test]
fn ten_block_example_chains_three_blocks() {
    let mut disk = memory_disk(10, 4, AllocationPolicy::Random { seed: Some(1) });

    disk.write_file("a", b"ABCDEFGHI").unwrap();

    let chain = disk.chain_of("a").unwrap();
    assert_eq!(chain.len(), 3);
    assert_eq!(disk.disk_usage().free_blocks, 6);
    assert_eq!(disk.read_file("a").unwrap(), b"ABCDEFGHI");

    let dev = disk.into_device();
    let width = 4 + RECORD_TRAILER_BYTES;
    let record = |addr: usize| &dev.as_bytes()[addr * width..(addr + 1) * width];
    assert_eq!(&record(chain[0])[..4], b"ABCD");
    assert_eq!(&record(chain[1])[..4], b"EFGH");
    assert_eq!(&record(chain[2])[..4], b"I   ");
    assert_eq!(&record(chain[2])[8..], &EOF_POINTER.to_be_bytes());
}

#[test]
fn round_trips_through_file_backed_disk() {
    let image = NamedTempFile::new().unwrap();
    let config = config(200, 61, AllocationPolicy::Random { seed: Some(17) });
    let dev = FileBlockEmulatorBuilder::from(image.reopen().unwrap())
        .with_block_count(config.total_blocks)
        .with_block_bytes(config.record_bytes())
        .build()
        .unwrap();
    let mut disk = LinkedDisk::format(dev, config).unwrap();

    let poem = "Two roads diverged in a yellow wood,\nAnd sorry I could not travel both\n\
                And be one traveler, long I stood\nAnd looked down one as far as I could";
    let binary: Vec<u8> = (0..=255).cycle().take(1000).collect();
    disk.write_file("road", poem.as_bytes()).unwrap();
    disk.write_file("bytes", &binary).unwrap();
    disk.sync().unwrap();

    assert_eq!(disk.read_file("road").unwrap(), poem.as_bytes());
    assert_eq!(disk.read_file("bytes").unwrap(), binary);

    let file = disk.into_device().into_file();
    assert_eq!(
        file.metadata().unwrap().len(),
        (200 * (61 + RECORD_TRAILER_BYTES)) as u64
    );
}

#[test]
fn records_are_readable_after_reopening_the_image() {
    let image = NamedTempFile::new().unwrap();
    let config = config(16, 8, AllocationPolicy::Sequential);
    let dev = FileBlockEmulatorBuilder::from(image.reopen().unwrap())
        .with_block_count(config.total_blocks)
        .with_block_bytes(config.record_bytes())
        .build()
        .unwrap();
    let mut disk = LinkedDisk::format(dev, config).unwrap();
    let head = disk.write_file("note", b"stored on the image").unwrap();
    disk.sync().unwrap();

    let dev = FileBlockEmulator::open_disk(image.path(), 16, config.record_bytes()).unwrap();
    let mut store = BlockStore::open(dev, 8).unwrap();
    let mut reader = ChainReader::new(&mut store);
    assert_eq!(reader.read_chain(head).unwrap(), b"stored on the image");
}

#[test]
fn empty_file_takes_one_empty_eof_block() {
    let mut disk = memory_disk(8, 4, AllocationPolicy::Sequential);

    disk.write_file("empty", b"").unwrap();

    assert_eq!(disk.chain_of("empty").unwrap(), vec![1]);
    assert_eq!(disk.disk_usage().free_blocks, 6);
    assert_eq!(disk.read_file("empty").unwrap(), Vec::<u8>::new());
}

#[test]
fn write_needing_exactly_the_free_blocks_succeeds() {
    let mut disk = memory_disk(6, 3, AllocationPolicy::Random { seed: Some(5) });
    let remaining = disk.disk_usage().free_blocks;
    let content = vec![b'x'; remaining * 3];

    disk.write_file("fill", &content).unwrap();

    assert_eq!(disk.disk_usage().free_blocks, 0);
    assert_eq!(disk.read_file("fill").unwrap(), content);
}

#[test]
fn write_needing_one_block_too_many_changes_nothing() {
    let mut disk = memory_disk(6, 3, AllocationPolicy::Random { seed: Some(5) });
    disk.write_file("small", b"ab").unwrap();
    let remaining = disk.disk_usage().free_blocks;
    let content = vec![b'x'; remaining * 3 + 1];

    match disk.write_file("big", &content) {
        Err(LinkFsError::InsufficientSpace { needed, available }) => {
            assert_eq!(needed, remaining + 1);
            assert_eq!(available, remaining);
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(disk.disk_usage().free_blocks, remaining);
    assert!(matches!(disk.read_file("big"), Err(LinkFsError::NotFound(_))));
}

#[test]
fn full_disk_reports_insufficient_space_for_empty_file() {
    let mut disk = memory_disk(3, 2, AllocationPolicy::Sequential);
    disk.write_file("a", b"abcd").unwrap();
    assert!(matches!(
        disk.write_file("b", b""),
        Err(LinkFsError::InsufficientSpace {
            needed: 1,
            available: 0
        })
    ));
}

#[test]
fn blocks_are_conserved_through_writes_and_deletes() {
    let mut disk = memory_disk(300, 7, AllocationPolicy::Random { seed: Some(2024) });
    let mut live: Vec<(String, Vec<u8>)> = Vec::new();

    for round in 0..120usize {
        if round % 4 == 3 && !live.is_empty() {
            let (id, _) = live.remove(round % live.len());
            let blocks = disk.chain_of(&id).unwrap().len();
            let before = disk.disk_usage().free_blocks;
            disk.delete_file(&id).unwrap();
            assert_eq!(disk.disk_usage().free_blocks, before + blocks);
            assert!(matches!(disk.read_file(&id), Err(LinkFsError::NotFound(_))));
        } else {
            let id = format!("file-{}", round);
            let content: Vec<u8> = (0..(round * 13) % 50).map(|b| b as u8).collect();
            match disk.write_file(&id, &content) {
                Ok(_) => live.push((id, content)),
                Err(e) => assert!(e.is_out_of_space(), "unexpected error {}", e),
            }
        }

        let report = disk.audit().unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.free_blocks + report.used_blocks + 1, report.total_blocks);
    }

    // No block belongs to two chains or to a chain and the pool.
    let mut seen = HashSet::new();
    for (id, content) in &live {
        for addr in disk.chain_of(id).unwrap() {
            assert_ne!(addr, linkfs::HEADER_BLOCK);
            assert!(seen.insert(addr), "block {} shared", addr);
        }
        assert_eq!(&disk.read_file(id).unwrap(), content);
    }
    assert_eq!(seen.len() + disk.disk_usage().free_blocks + 1, 300);
}

#[test]
fn random_placement_scatters_chains() {
    let mut disk = memory_disk(1000, 61, AllocationPolicy::Random { seed: Some(8) });
    let content = vec![b'r'; 61 * 20];
    disk.write_file("scattered", &content).unwrap();

    let chain = disk.chain_of("scattered").unwrap();
    let contiguous = chain.windows(2).all(|pair| pair[1] == pair[0] + 1);
    assert!(!contiguous, "random placement produced a contiguous run");
    assert_eq!(disk.read_file("scattered").unwrap(), content);
}

#[test]
fn bulk_load_from_parsed_input() {
    let mut disk = memory_disk(1000, 61, AllocationPolicy::Random { seed: None });
    let input = "poem\nTwo roads diverged in a yellow wood, and sorry I could not travel both\n\
                 short\nhi\n";
    let pairs = linkfs::parse_pairs(input.as_bytes()).unwrap();

    let summary = disk.bulk_load(pairs).unwrap();

    assert_eq!(summary.loaded, vec!["poem", "short"]);
    assert_eq!(summary.skipped, 0);
    assert_eq!(disk.chain_of("poem").unwrap().len(), 2);
    assert_eq!(disk.read_file("short").unwrap(), b"hi");
}
