use partid_core::fake_device::GUID_LINUX_FS;
use partid_core::{
    enrich_all, find_all, find_by_name, probe_path, reconcile, DevNodeOpener, DiskImage,
    OsPartition, PartError,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const DISK_GUID: &str = "a0b1c2d3-e4f5-4a6b-8c7d-9e0f1a2b3c4d";
const ROOT_GUID: &str = "66666666-7777-4888-9999-aaaaaaaaaaaa";

fn write_sysfs_disk(root: &Path, name: &str, size: u64, minor: u32) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("size"), format!("{}\n", size)).unwrap();
    fs::write(dir.join("dev"), format!("8:{}\n", minor)).unwrap();
}

fn write_sysfs_part(root: &Path, disk: &str, number: u32, start: u64, size: u64) {
    let dir = root.join(disk).join(format!("{}{}", disk, number));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("size"), format!("{}\n", size)).unwrap();
    fs::write(dir.join("start"), format!("{}\n", start)).unwrap();
    fs::write(dir.join("partition"), format!("{}\n", number)).unwrap();
    fs::write(dir.join("dev"), format!("8:{}\n", number)).unwrap();
}

#[test]
fn probe_path_reads_mbr_image_file() {
    let tmp = tempdir().unwrap();
    let image = tmp.path().join("mbr.img");
    fs::write(
        &image,
        DiskImage::mbr(0x1A2B3C4D)
            .partition(1, 0x83, 2048, 204800)
            .build(8),
    )
    .unwrap();

    let table = probe_path(&image).unwrap();
    assert_eq!(table.ptuuid, None);
    assert_eq!(table.partitions.len(), 1);
    assert_eq!(table.partitions[0].start_in_sectors, 2048);
    assert_eq!(table.partitions[0].end_in_sectors, 206847);
    assert_eq!(table.partitions[0].partuuid, "1a2b3c4d-01");
}

#[test]
fn probe_path_reads_gpt_image_file() {
    let tmp = tempdir().unwrap();
    let image = tmp.path().join("gpt.img");
    fs::write(
        &image,
        DiskImage::gpt(DISK_GUID.parse().unwrap())
            .gpt_partition(GUID_LINUX_FS, ROOT_GUID.parse().unwrap(), 2048, 206847)
            .build(64),
    )
    .unwrap();

    let table = probe_path(&image).unwrap();
    assert_eq!(table.ptuuid.as_deref(), Some(DISK_GUID));
    assert_eq!(table.partitions[0].partuuid, ROOT_GUID);

    let os = vec![OsPartition::new("sda1", 2048, 204800)];
    let reconciled = reconcile(&os, &table.partitions);
    assert_eq!(reconciled[0].partuuid.as_deref(), Some(ROOT_GUID));
}

#[test]
fn probe_path_truncated_image_is_short_read() {
    let tmp = tempdir().unwrap();
    let image = tmp.path().join("tiny.img");
    fs::write(&image, vec![0u8; 300]).unwrap();

    assert!(matches!(
        probe_path(&image),
        Err(PartError::ShortRead { actual: 300, .. })
    ));
}

#[test]
fn enumerate_and_enrich_from_sysfs_and_dev_tree() {
    let tmp = tempdir().unwrap();
    let sys = tmp.path().join("sys/block");
    let dev = tmp.path().join("dev");
    fs::create_dir_all(&sys).unwrap();
    fs::create_dir_all(&dev).unwrap();

    // sda: legacy MBR, sdb: GPT, sdc: blank, sdd: sysfs entry without a node.
    write_sysfs_disk(&sys, "sda", 8, 0);
    write_sysfs_part(&sys, "sda", 1, 2048, 204800);
    fs::write(
        dev.join("sda"),
        DiskImage::mbr(0x0BADF00D)
            .partition(1, 0x83, 2048, 204800)
            .build(8),
    )
    .unwrap();

    write_sysfs_disk(&sys, "sdb", 64, 16);
    write_sysfs_part(&sys, "sdb", 1, 2048, 204800);
    fs::write(
        dev.join("sdb"),
        DiskImage::gpt(DISK_GUID.parse().unwrap())
            .gpt_partition(GUID_LINUX_FS, ROOT_GUID.parse().unwrap(), 2048, 206847)
            .build(64),
    )
    .unwrap();

    write_sysfs_disk(&sys, "sdc", 8, 32);
    fs::write(dev.join("sdc"), vec![0u8; 4096]).unwrap();

    write_sysfs_disk(&sys, "sdd", 8, 48);
    write_sysfs_part(&sys, "sdd", 1, 2048, 8);

    let mut devices = find_all(&sys, false).unwrap();
    let outcomes = enrich_all(&DevNodeOpener::new(&dev), &mut devices);
    let probed: Vec<bool> = outcomes.iter().map(|o| o.is_probed()).collect();
    assert_eq!(probed, vec![true, true, true, false]);

    let json = serde_json::to_value(&devices).unwrap();
    assert_eq!(json[0]["name"], "sda");
    assert!(json[0].get("PTUUID").is_none());
    assert_eq!(json[0]["partitions"][0]["PARTUUID"], "0badf00d-01");

    assert_eq!(json[1]["PTUUID"], DISK_GUID);
    assert_eq!(json[1]["partitions"][0]["PARTUUID"], ROOT_GUID);

    assert!(json[2].get("PTUUID").is_none());
    assert_eq!(json[2]["partitions"], serde_json::json!([]));

    assert_eq!(json[3]["name"], "sdd");
    assert_eq!(json[3]["partitions"][0]["startInSectors"], 2048);
    assert!(json[3]["partitions"][0].get("PARTUUID").is_none());
}

#[test]
fn probing_unchanged_device_twice_is_identical() {
    let tmp = tempdir().unwrap();
    let sys = tmp.path().join("sys/block");
    let dev = tmp.path().join("dev");
    fs::create_dir_all(&dev).unwrap();
    write_sysfs_disk(&sys, "sda", 8, 0);
    write_sysfs_part(&sys, "sda", 2, 4096, 1024);
    fs::write(
        dev.join("sda"),
        DiskImage::mbr(42).partition(2, 0x83, 4096, 1024).build(8),
    )
    .unwrap();

    let opener = DevNodeOpener::new(&dev);
    let mut first = vec![find_by_name(&sys, "sda").unwrap()];
    let mut second = first.clone();
    enrich_all(&opener, &mut first);
    enrich_all(&opener, &mut second);
    assert_eq!(first, second);
    assert_eq!(
        first[0].partitions[0].partuuid.as_deref(),
        Some("0000002a-02")
    );
}

#[test]
fn enrich_opens_nested_dev_node_for_bang_named_device() {
    let tmp = tempdir().unwrap();
    let sys = tmp.path().join("sys/block");
    let dev = tmp.path().join("dev");

    let disk = sys.join("cciss!c0d0");
    let part = disk.join("cciss!c0d0p1");
    fs::create_dir_all(&part).unwrap();
    fs::write(disk.join("size"), "8\n").unwrap();
    fs::write(disk.join("dev"), "104:0\n").unwrap();
    fs::write(part.join("size"), "204800\n").unwrap();
    fs::write(part.join("start"), "2048\n").unwrap();
    fs::write(part.join("partition"), "1\n").unwrap();
    fs::write(part.join("dev"), "104:1\n").unwrap();

    fs::create_dir_all(dev.join("cciss")).unwrap();
    fs::write(
        dev.join("cciss/c0d0"),
        DiskImage::mbr(0x1A2B3C4D)
            .partition(1, 0x83, 2048, 204800)
            .build(8),
    )
    .unwrap();

    let mut devices = find_all(&sys, false).unwrap();
    let outcomes = enrich_all(&DevNodeOpener::new(&dev), &mut devices);
    assert!(outcomes[0].is_probed());
    assert_eq!(devices[0].name, "cciss!c0d0");
    assert_eq!(
        devices[0].partitions[0].partuuid.as_deref(),
        Some("1a2b3c4d-01")
    );
}

#[test]
fn enrich_opens_device_by_major_minor_when_name_differs() {
    let tmp = tempdir().unwrap();
    let sys = tmp.path().join("sys/block");
    let dev = tmp.path().join("dev");
    write_sysfs_disk(&sys, "sda", 8, 0);
    write_sysfs_part(&sys, "sda", 1, 2048, 204800);

    fs::create_dir_all(dev.join("block")).unwrap();
    fs::write(
        dev.join("block/8:0"),
        DiskImage::mbr(0xCAFEBABE)
            .partition(1, 0x83, 2048, 204800)
            .build(8),
    )
    .unwrap();

    let mut devices = find_all(&sys, false).unwrap();
    let outcomes = enrich_all(&DevNodeOpener::new(&dev), &mut devices);
    assert!(outcomes[0].is_probed());
    assert_eq!(
        devices[0].partitions[0].partuuid.as_deref(),
        Some("cafebabe-01")
    );
}
