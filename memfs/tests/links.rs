use memfs::{Error, FileKind, FileSystem, MAX_SYMLINK_HOPS};

fn fs_with_file(path: &str, data: &[u8]) -> FileSystem {
    let mut fs = FileSystem::new(16, 8, 16);
    fs.create(path).unwrap();
    let fd = fs.open(path).unwrap();
    fs.write(fd, data).unwrap();
    fs.close(fd).unwrap();
    fs
}

#[test]
fn unlink_twice() {
    let mut fs = fs_with_file("/f", b"data");
    fs.unlink("/f").unwrap();
    assert_eq!(fs.unlink("/f"), Err(Error::NotFound("/f".into())));
    assert_eq!(fs.file_count(), 1);
    assert_eq!(fs.storage().free_blocks(), 16);
}

#[test]
fn hard_link_keeps_data_alive() {
    let mut fs = fs_with_file("/f", b"shared bytes");
    fs.link("/f", "/g").unwrap();
    assert_eq!(fs.stat("/f").unwrap().links(), 2);
    assert_eq!(fs.ls()["/f"], fs.ls()["/g"]);

    fs.unlink("/f").unwrap();
    assert_eq!(fs.stat("/g").unwrap().links(), 1);

    let fd = fs.open("/g").unwrap();
    assert_eq!(fs.read(fd, 64).unwrap(), b"shared bytes");
    fs.close(fd).unwrap();

    fs.unlink("/g").unwrap();
    assert_eq!(fs.storage().free_blocks(), 16);
}

#[test]
fn link_errors() {
    let mut fs = fs_with_file("/f", b"");
    fs.create("/g").unwrap();
    fs.mkdir("/d").unwrap();

    assert_eq!(fs.link("/x", "/y"), Err(Error::SourceNotFound("/x".into())));
    assert_eq!(fs.link("/f", "/g"), Err(Error::DestExists("/g".into())));
    assert_eq!(fs.link("/d", "/e"), Err(Error::IsADirectory("/d".into())));
    assert_eq!(fs.link("/f", "/no/f"), Err(Error::NotFound("/no".into())));
    assert_eq!(fs.stat("/f").unwrap().links(), 1);
}

#[test]
fn unlink_directory_is_rejected() {
    let mut fs = FileSystem::new(4, 8, 4);
    fs.mkdir("/d").unwrap();
    assert_eq!(fs.unlink("/d"), Err(Error::IsADirectory("/d".into())));
    assert!(fs.ls().contains_key("/d"));
}

#[test]
fn unlink_while_open_defers_reclamation() {
    let mut fs = fs_with_file("/f", b"still here");
    let slot = fs.ls()["/f"];
    let a = fs.open("/f").unwrap();
    let b = fs.open("/f").unwrap();

    fs.unlink("/f").unwrap();
    assert_eq!(fs.stat("/f"), Err(Error::NotFound("/f".into())));
    assert_eq!(fs.descriptor(slot).unwrap().links(), 0);
    assert_eq!(fs.storage().free_blocks(), 14);

    // 句柄仍可读写
    assert_eq!(fs.read(a, 64).unwrap(), b"still here");
    fs.close(a).unwrap();
    assert!(fs.descriptor(slot).is_some());

    fs.close(b).unwrap();
    assert!(fs.descriptor(slot).is_none());
    assert_eq!(fs.storage().free_blocks(), 16);

    // 槽位可被复用
    assert_eq!(fs.create("/new"), Ok(slot));
}

#[test]
fn symlink_is_followed_on_open() {
    let mut fs = fs_with_file("/myfile.txt", b"My name is Marian");
    fs.symlink("/myfile.txt", "/mylink").unwrap();

    let link = fs.stat("/mylink").unwrap();
    assert_eq!(link.kind(), FileKind::Symlink);
    assert_eq!(link.symlink_target(), Some("/myfile.txt"));
    assert_eq!(fs.readlink("/mylink"), Ok("/myfile.txt"));
    assert_eq!(
        fs.readlink("/myfile.txt"),
        Err(Error::NotASymlink("/myfile.txt".into()))
    );

    let fd = fs.open("/mylink").unwrap();
    assert_eq!(fs.read_to_string(fd, 17).unwrap(), "My name is Marian");
    fs.close(fd).unwrap();

    // 删除链接不影响目标
    fs.unlink("/mylink").unwrap();
    assert_eq!(fs.stat("/myfile.txt").unwrap().size(), 17);
}

#[test]
fn relative_symlink_target_resolves_against_cwd() {
    let mut fs = FileSystem::new(8, 8, 8);
    fs.mkdir("/d").unwrap();
    fs.create("/d/f").unwrap();
    fs.symlink("f", "/d/link").unwrap();

    assert_eq!(fs.open("/d/link"), Err(Error::NotFound("/f".into())));
    fs.cd("/d").unwrap();
    assert!(fs.open("link").is_ok());
}

#[test]
fn symlink_chain_and_truncate() {
    let mut fs = fs_with_file("/f", b"0123456789");
    fs.symlink("/f", "/l1").unwrap();
    fs.symlink("/l1", "/l2").unwrap();

    fs.truncate("/l2", 4).unwrap();
    assert_eq!(fs.stat("/f").unwrap().size(), 4);
    assert_eq!(fs.stat("/l2").unwrap().size(), 0);
}

#[test]
fn dangling_symlink() {
    let mut fs = FileSystem::new(4, 8, 4);
    fs.symlink("/gone", "/l").unwrap();
    assert_eq!(fs.open("/l"), Err(Error::NotFound("/gone".into())));
}

#[test]
fn symlink_cycle_is_detected() {
    let mut fs = FileSystem::new(4, 8, 8);
    fs.symlink("/b", "/a").unwrap();
    fs.symlink("/a", "/b").unwrap();
    assert_eq!(fs.open("/a"), Err(Error::InvalidSymlinkCycle("/a".into())));

    fs.symlink("self", "/s").unwrap();
    fs.symlink("s", "/self").unwrap();
    assert_eq!(fs.open("/s"), Err(Error::InvalidSymlinkCycle("/s".into())));
}

#[test]
fn long_symlink_chain_within_limit() {
    let mut fs = FileSystem::new(4, 8, MAX_SYMLINK_HOPS + 2);
    fs.create("/target").unwrap();
    fs.symlink("/target", "/l0").unwrap();
    for i in 1..MAX_SYMLINK_HOPS {
        fs.symlink(&format!("/l{}", i - 1), &format!("/l{i}")).unwrap();
    }

    let last = format!("/l{}", MAX_SYMLINK_HOPS - 1);
    let fd = fs.open(&last).unwrap();
    fs.close(fd).unwrap();

    // 目标被删除后槽位才可复用，链首尾相接成环
    fs.unlink("/target").unwrap();
    assert_eq!(fs.file_count(), MAX_SYMLINK_HOPS + 1);
    fs.symlink(&last, "/target").unwrap();
    assert_eq!(fs.open("/l0"), Err(Error::InvalidSymlinkCycle("/l0".into())));
}
