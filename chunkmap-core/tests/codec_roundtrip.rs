use chunkmap_core::{decode, encode, encode_compressed, ChunkInfo, ChunkManifest, ManifestError};

fn scenario() -> ChunkManifest {
    let mut m = ChunkManifest::new("movie.mkv", "video/x-matroska", 150);
    m.push_chunk(ChunkInfo::new("b", 100, 50));
    m.push_chunk(ChunkInfo::new("a", 0, 100));
    m
}

#[test]
fn scenario_decodes_sorted_and_partitions() {
    let bytes = encode(&scenario()).unwrap();
    let m = decode(&bytes, false).unwrap();
    assert_eq!(m.chunks, vec![ChunkInfo::new("a", 0, 100), ChunkInfo::new("b", 100, 50)]);
    assert!(chunkmap_core::validate(&m).is_ok());
    assert_eq!(m.chunks.last().unwrap().end(), m.size);
}

#[test]
fn roundtrip_keeps_metadata() {
    let m = decode(&encode(&scenario()).unwrap(), false).unwrap();
    assert_eq!(m.name, "movie.mkv");
    assert_eq!(m.mime, "video/x-matroska");
    assert_eq!(m.size, 150);
}

#[test]
fn compressed_decode_matches_plain_decode() {
    let m = scenario();
    let plain = decode(&encode(&m).unwrap(), false).unwrap();
    let gz = decode(&encode_compressed(&m).unwrap(), true).unwrap();
    assert_eq!(plain, gz);
}

#[test]
fn empty_manifest_decodes_to_defaults() {
    let m = decode(&encode(&ChunkManifest::default()).unwrap(), false).unwrap();
    assert!(m.name.is_empty());
    assert!(m.mime.is_empty());
    assert_eq!(m.size, 0);
    assert!(m.chunks.is_empty());
}

#[test]
fn equal_offsets_keep_input_order() {
    let json = br#"{"chunks":[
        {"fid":"z","offset":10,"size":1},
        {"fid":"A","offset":5,"size":5},
        {"fid":"B","offset":5,"size":5},
        {"fid":"y","offset":0,"size":5}
    ]}"#;
    let m = decode(json, false).unwrap();
    let fids: Vec<&str> = m.chunks.iter().map(|c| c.fid.as_str()).collect();
    assert_eq!(fids, vec!["y", "A", "B", "z"]);
}

#[test]
fn non_gzip_bytes_are_decompression_error() {
    let err = decode(b"definitely not gzip", true).unwrap_err();
    assert!(matches!(err, ManifestError::Decompression(_)), "{err}");
}

#[test]
fn gzip_of_garbage_is_parse_error() {
    let gz = chunkmap_core::compress(b"\x00\x01garbage{{").unwrap();
    let err = decode(&gz, true).unwrap_err();
    assert!(matches!(err, ManifestError::Parse(_)), "{err}");
    assert!(!err.is_transport_related());
}

#[test]
fn plain_json_flagged_compressed_is_rejected() {
    let bytes = encode(&scenario()).unwrap();
    assert!(matches!(decode(&bytes, true), Err(ManifestError::Decompression(_))));
}

#[test]
fn absent_null_and_unknown_keys_are_lenient() {
    let json = br#"{"name":null,"mime":"text/plain","size":null,"extra":{"k":1},
        "chunks":[{"fid":"1,ab","offset":0,"size":3,"cookie":"x"},{"offset":3}]}"#;
    let m = decode(json, false).unwrap();
    assert_eq!(m.name, "");
    assert_eq!(m.mime, "text/plain");
    assert_eq!(m.size, 0);
    assert_eq!(m.chunks[1], ChunkInfo::new("", 3, 0));
}

#[test]
fn chunks_null_reads_as_empty() {
    let m = decode(br#"{"name":"x","chunks":null}"#, false).unwrap();
    assert!(!m.is_chunked());
}

#[test]
fn negative_offset_is_parse_error() {
    let json = br#"{"chunks":[{"fid":"a","offset":-1,"size":3}]}"#;
    assert!(matches!(decode(json, false), Err(ManifestError::Parse(_))));
}

#[test]
fn truncated_json_is_parse_error() {
    let bytes = encode(&scenario()).unwrap();
    let err = decode(&bytes[..bytes.len() - 3], false).unwrap_err();
    assert!(matches!(err, ManifestError::Parse(_)));
}

#[test]
fn encoded_keys_match_wire_format() {
    let v: serde_json::Value = serde_json::from_slice(&encode(&scenario()).unwrap()).unwrap();
    let obj = v.as_object().unwrap();
    let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
    keys.sort();
    assert_eq!(keys, vec!["chunks", "mime", "name", "size"]);
    assert_eq!(v["chunks"][0]["fid"], "b");
}
