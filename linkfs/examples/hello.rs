use linkfs::{AllocationPolicy, DiskConfig, FileBlockEmulatorBuilder, LinkedDisk};

pub fn main() {
    let config = DiskConfig::builder()
        .with_total_blocks(10)
        .with_payload_capacity(4)
        .with_policy(AllocationPolicy::Random { seed: None })
        .build()
        .expect("valid geometry");
    let tmp = tempfile::tempfile().unwrap();
    let dev = FileBlockEmulatorBuilder::from(tmp)
        .with_block_count(config.total_blocks)
        .with_block_bytes(config.record_bytes())
        .build()
        .expect("Could not initialize disk emulator.");

    let mut disk = LinkedDisk::format(dev, config).expect("should format");
    disk.write_file("a", b"ABCDEFGHI").unwrap();
    println!("chain: {:?}", disk.chain_of("a").unwrap());
    println!("content: {}", String::from_utf8_lossy(&disk.read_file("a").unwrap()));
    println!("{:?}", disk.disk_usage());
}
