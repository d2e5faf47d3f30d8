use memfs::{FileSystem, FsConfig, Path};
use proptest::prelude::*;

const BLOCK_SIZE: usize = 8;
const MAX_DIRECT: usize = 4;
const NUM_BLOCKS: usize = 16;

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just(".".to_owned()),
        Just("..".to_owned()),
        "[a-c]{1,3}",
    ]
}

fn raw_path() -> impl Strategy<Value = String> {
    (any::<bool>(), prop::collection::vec(segment(), 0..8)).prop_map(|(absolute, segs)| {
        let joined = segs.join("/");
        if absolute { format!("/{joined}") } else { joined }
    })
}

#[derive(Debug, Clone)]
enum Op {
    Write { offset: usize, data: Vec<u8> },
    Truncate(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let capacity = MAX_DIRECT * BLOCK_SIZE;
    prop_oneof![
        (0..capacity - BLOCK_SIZE, prop::collection::vec(1u8..=255, 0..=BLOCK_SIZE))
            .prop_map(|(offset, data)| Op::Write { offset, data }),
        (0..=capacity).prop_map(Op::Truncate),
    ]
}

/// 以`Vec<u8>`为参照模型
fn apply(model: &mut Vec<u8>, op: &Op) {
    match op {
        Op::Write { offset, data } => {
            if data.is_empty() {
                return;
            }
            let end = offset + data.len();
            if model.len() < end {
                model.resize(end, 0);
            }
            model[*offset..end].copy_from_slice(data);
        }
        Op::Truncate(size) => model.resize(*size, 0),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn normalize_is_idempotent(path in raw_path(), cwd in raw_path()) {
        let cwd = cwd.normalize("/");
        let once = path.normalize(&cwd);

        prop_assert!(once.starts_with('/'));
        prop_assert!(once == "/" || !once.ends_with('/'));
        prop_assert!(!once.contains("//"));
        prop_assert!(once.split('/').all(|cmp| cmp != "." && cmp != ".."));
        prop_assert_eq!(once.normalize("/"), once.clone());
        prop_assert_eq!(once.normalize(&cwd), once);
    }

    #[test]
    fn file_matches_model(ops in prop::collection::vec(op(), 1..24)) {
        let mut fs = FileSystem::with_config(FsConfig {
            num_blocks: NUM_BLOCKS,
            block_size: BLOCK_SIZE,
            max_files: 4,
            max_direct_blocks: MAX_DIRECT,
        });
        fs.create("/f").unwrap();
        let fd = fs.open("/f").unwrap();
        let mut model = Vec::new();

        for op in &ops {
            match op {
                Op::Write { offset, data } => {
                    fs.seek(fd, *offset).unwrap();
                    prop_assert_eq!(fs.write(fd, data), Ok(data.len()));
                    prop_assert_eq!(fs.tell(fd), Ok(offset + data.len()));
                }
                Op::Truncate(size) => fs.truncate("/f", *size).unwrap(),
            }
            apply(&mut model, op);

            let stat = fs.stat("/f").unwrap();
            let blocks = model.len().div_ceil(BLOCK_SIZE);
            prop_assert_eq!(stat.size(), model.len());
            prop_assert_eq!(stat.blocks().len(), blocks);
            prop_assert_eq!(fs.storage().free_blocks(), NUM_BLOCKS - blocks);
        }

        fs.seek(fd, 0).unwrap();
        prop_assert_eq!(fs.read(fd, MAX_DIRECT * BLOCK_SIZE).unwrap(), model);
    }
}
