//! Importing raw external test cases as seed records.
//!
//! A raw byte blob (typically a fuzzer-produced test case) becomes a
//! record describing a run over one symbolic file plus symbolic standard
//! input of the same size, so the engine can replay and then diverge
//! from the input that produced it.

use crate::format::{SeedObject, SeedRecord, CURRENT_VERSION};

/// Synthetic file-metadata blob paired with each injected data object.
/// The layout is owned by the replay runtime's ABI; the sentinel pattern
/// is preserved verbatim and must not be reinterpreted here.
const SYNTHETIC_STAT: [u8; 144] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01, 0x00, 0x00, 0x00,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

/// Value of the trailing format-marker object.
const MODEL_VERSION: u32 = 1;

/// Build a seed record from a raw test case.
///
/// The synthesized argument vector requests one symbolic file (`A`) and
/// symbolic stdin, both sized to the raw input. Non-empty `extra_args`
/// are additionally injected as symbolic objects: a leading `n_args`
/// count followed by one positionally-named object per argument, ahead
/// of the data objects. The record always ends with the `model_version`
/// marker, giving `5 + 1 + N` objects with `N` extra arguments and 5
/// without.
pub fn import_raw(raw: &[u8], program: &str, extra_args: &[String]) -> SeedRecord {
    let size = raw.len().to_string();
    let args = vec![
        program.to_string(),
        "A".to_string(),
        "--sym-files".to_string(),
        "1".to_string(),
        "1".to_string(),
        size.clone(),
        "--sym-stdin".to_string(),
        size,
    ];

    let mut objects = Vec::with_capacity(5 + extra_args.len() + 1);
    if !extra_args.is_empty() {
        objects.push(SeedObject::new(
            "n_args",
            (extra_args.len() as u32).to_le_bytes(),
        ));
        for (i, arg) in extra_args.iter().enumerate() {
            objects.push(SeedObject::new(format!("arg{}", i), arg.as_bytes()));
        }
    }
    objects.push(SeedObject::new("A-data", raw));
    objects.push(SeedObject::new("A-data-stat", SYNTHETIC_STAT));
    objects.push(SeedObject::new("stdin", raw));
    objects.push(SeedObject::new("stdin-stat", SYNTHETIC_STAT));
    objects.push(SeedObject::new("model_version", MODEL_VERSION.to_le_bytes()));

    SeedRecord {
        version: CURRENT_VERSION,
        args,
        sym_argv_count: 0,
        sym_argv_len: 0,
        objects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_import_has_five_objects() {
        let record = import_raw(b"0123456789", "prog.bc", &[]);
        let names: Vec<&str> = record.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["A-data", "A-data-stat", "stdin", "stdin-stat", "model_version"]
        );
        assert_eq!(record.objects[0].bytes, b"0123456789");
        assert_eq!(record.objects[2].bytes, b"0123456789");
        assert_eq!(record.objects[0].bytes.len(), 10);
    }

    #[test]
    fn test_argument_vector_requests_symbolic_file_and_stdin() {
        let record = import_raw(&[0u8; 32], "prog.bc", &[]);
        assert_eq!(
            record.args,
            vec!["prog.bc", "A", "--sym-files", "1", "1", "32", "--sym-stdin", "32"]
        );
        assert_eq!(record.sym_argv_count, 0);
        assert_eq!(record.sym_argv_len, 0);
        assert_eq!(record.version, CURRENT_VERSION);
    }

    #[test]
    fn test_extra_args_are_prepended_as_objects() {
        let extra = vec!["-x".to_string(), "--level=2".to_string()];
        let record = import_raw(b"0123456789", "prog.bc", &extra);
        assert_eq!(record.objects.len(), 8);

        assert_eq!(record.objects[0].name, "n_args");
        assert_eq!(record.objects[0].bytes, 2u32.to_le_bytes());
        assert_eq!(record.objects[1].name, "arg0");
        assert_eq!(record.objects[1].bytes, b"-x");
        assert_eq!(record.objects[2].name, "arg1");
        assert_eq!(record.objects[2].bytes, b"--level=2");
        assert_eq!(record.objects[3].name, "A-data");
    }

    #[test]
    fn test_stat_objects_carry_the_sentinel_pattern() {
        let record = import_raw(b"x", "prog.bc", &[]);
        for name in ["A-data-stat", "stdin-stat"] {
            let stat = record.objects.iter().find(|o| o.name == name).unwrap();
            assert_eq!(stat.bytes.len(), 144);
            assert_eq!(&stat.bytes[..8], &[0xff; 8]);
            assert_eq!(stat.bytes[8], 0x01);
            assert_eq!(&stat.bytes[56..64], &[0x00; 8]);
            assert_eq!(&stat.bytes[64..], &[0xff; 80]);
        }
    }

    #[test]
    fn test_trailing_marker_value() {
        let record = import_raw(b"", "prog.bc", &[]);
        let marker = record.objects.last().unwrap();
        assert_eq!(marker.name, "model_version");
        assert_eq!(marker.bytes, 1u32.to_le_bytes());
    }

    #[test]
    fn test_empty_input_sizes_to_zero() {
        let record = import_raw(b"", "prog.bc", &[]);
        assert_eq!(record.args[5], "0");
        assert_eq!(record.args[7], "0");
        assert!(record.objects[0].bytes.is_empty());
    }
}
