use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use chunkmap_core::{
    codec, reassemble, validate, ChunkInfo, ChunkManifest, ChunkPlan, ChunkSource,
    ReassembleOptions,
};

const DEFAULT_CHUNK: u64 = 2 << 20;
const FID_HEX_LEN: usize = 16;

#[derive(Parser)]
#[command(name = "chunkmap", version, about = "Chunk manifest tool for a directory-backed chunk store")]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Split a file into chunks stored under <store> and write its manifest
    Split {
        input: PathBuf,
        store: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CHUNK, value_parser = clap::value_parser!(u64).range(1..))]
        chunk_size: u64,
        #[arg(long, default_value = "")]
        mime: String,
        #[arg(long, default_value_t = false)]
        gzip: bool,
        /// Manifest path (default: <store>/<file name>.manifest.json[.gz])
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Print a decoded manifest as JSON, chunks in offset order
    Inspect {
        manifest: PathBuf,
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Check that the chunks tile the file without gaps or overlaps
    Validate {
        manifest: PathBuf,
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Rebuild the original file from the store
    Assemble {
        manifest: PathBuf,
        store: PathBuf,
        output: PathBuf,
        #[arg(long, default_value_t = false)]
        gzip: bool,
        /// Skip the layout check before fetching chunks
        #[arg(long, default_value_t = false)]
        no_verify: bool,
    },
    /// Remove every chunk the manifest references from the store
    Delete {
        manifest: PathBuf,
        store: PathBuf,
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Gzip a file (helper)
    Compress { input: PathBuf, output: PathBuf },
    /// Gunzip a file (helper)
    Decompress { input: PathBuf, output: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(&cli.log_level);
    match cli.cmd {
        Cmd::Split { input, store, chunk_size, mime, gzip, manifest } => {
            split(&input, &store, chunk_size, &mime, gzip, manifest)?
        }
        Cmd::Inspect { manifest, gzip } => inspect(&manifest, gzip)?,
        Cmd::Validate { manifest, gzip } => validate_cmd(&manifest, gzip)?,
        Cmd::Assemble { manifest, store, output, gzip, no_verify } => {
            assemble(&manifest, &store, &output, gzip, no_verify)?
        }
        Cmd::Delete { manifest, store, gzip } => delete(&manifest, &store, gzip)?,
        Cmd::Compress { input, output } => {
            let raw = fs::read(&input).with_context(|| format!("read {}", input.display()))?;
            fs::write(&output, codec::compress(&raw)?)
                .with_context(|| format!("write {}", output.display()))?;
        }
        Cmd::Decompress { input, output } => {
            let gz = fs::read(&input).with_context(|| format!("read {}", input.display()))?;
            let raw = codec::decompress(&gz).with_context(|| format!("gunzip {}", input.display()))?;
            fs::write(&output, raw).with_context(|| format!("write {}", output.display()))?;
        }
    }
    Ok(())
}

/// Respects `RUST_LOG` if set, otherwise uses `level`. Logs go to stderr.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

/// Chunks live as flat files named by fid.
struct DirStore {
    root: PathBuf,
}

impl DirStore {
    fn new(root: &Path) -> Self {
        Self { root: root.to_path_buf() }
    }

    fn path_for(&self, fid: &str) -> io::Result<PathBuf> {
        let rel = Path::new(fid);
        let plain = !fid.is_empty()
            && rel.components().count() == 1
            && matches!(rel.components().next(), Some(Component::Normal(_)));
        if !plain {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("fid is not a plain file name: {fid:?}"),
            ));
        }
        Ok(self.root.join(rel))
    }
}

impl ChunkSource for DirStore {
    fn fetch(&self, chunk: &ChunkInfo) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(&chunk.fid)?)
    }
}

/// Every stored chunk is its own object, so two uploads never share a fid
/// even when their bytes match. Deleting one file cannot touch another's chunks.
fn chunk_fid(upload_id: &[u8; 16], index: u64, data: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(upload_id);
    hasher.update(&index.to_le_bytes());
    hasher.update(data);
    hasher.finalize().to_hex().as_str()[..FID_HEX_LEN].to_string()
}

/// `--gzip`, or a path ending in `.gz`, marks the manifest as compressed.
fn is_compressed(path: &Path, flag: bool) -> bool {
    flag || path.extension().map(|e| e == "gz").unwrap_or(false)
}

fn load_manifest(path: &Path, gzip: bool) -> Result<ChunkManifest> {
    let buf = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let compressed = is_compressed(path, gzip);
    debug!(path = %path.display(), compressed, "loading manifest");
    codec::decode(&buf, compressed).with_context(|| format!("decode {}", path.display()))
}

fn split(
    input: &Path,
    store_dir: &Path,
    chunk_size: u64,
    mime: &str,
    gzip: bool,
    manifest_path: Option<PathBuf>,
) -> Result<()> {
    fs::create_dir_all(store_dir).with_context(|| format!("create dir {}", store_dir.display()))?;
    let store = DirStore::new(store_dir);
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow!("input has no file name: {}", input.display()))?;
    let f = File::open(input).with_context(|| format!("open {}", input.display()))?;
    let total = f.metadata()?.len();
    let plan = ChunkPlan::new(total, chunk_size)?;
    info!(file = %name, size = total, chunks = plan.len(), chunk_size, "splitting");

    let mut reader = BufReader::new(f);
    let mut manifest = ChunkManifest::new(name.clone(), mime, total);
    let upload_id: [u8; 16] = rand::random();
    for span in plan.spans() {
        let mut buf = vec![0u8; span.size as usize];
        reader
            .read_exact(&mut buf)
            .with_context(|| format!("read {} at offset {}", input.display(), span.offset))?;
        let fid = chunk_fid(&upload_id, span.index, &buf);
        let path = store.path_for(&fid)?;
        // create_new: a fid collision must never overwrite another file's chunk
        let mut f = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("create chunk {}", path.display()))?;
        f.write_all(&buf).with_context(|| format!("write chunk {}", path.display()))?;
        debug!(%fid, offset = span.offset, size = span.size, "chunk stored");
        manifest.push_chunk(ChunkInfo::new(fid, span.offset, span.size));
    }

    let manifest_path = manifest_path.unwrap_or_else(|| {
        let suffix = if gzip { ".manifest.json.gz" } else { ".manifest.json" };
        store_dir.join(format!("{name}{suffix}"))
    });
    let bytes = if is_compressed(&manifest_path, gzip) {
        codec::encode_compressed(&manifest)?
    } else {
        codec::encode(&manifest)?
    };
    fs::write(&manifest_path, bytes)
        .with_context(|| format!("write manifest {}", manifest_path.display()))?;

    eprintln!(
        "Split {} ({} bytes) into {} chunk(s); manifest {}",
        name,
        total,
        manifest.chunks.len(),
        manifest_path.display()
    );
    Ok(())
}

fn inspect(path: &Path, gzip: bool) -> Result<()> {
    let manifest = load_manifest(path, gzip)?;
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    eprintln!("digest {}", manifest.digest()?);
    Ok(())
}

fn validate_cmd(path: &Path, gzip: bool) -> Result<()> {
    let manifest = load_manifest(path, gzip)?;
    let report = validate(&manifest);
    if report.is_ok() {
        println!("OK: {} chunk(s) cover {} bytes", report.chunks, report.covered_end);
        return Ok(());
    }
    for fault in report.faults() {
        println!("FAULT: {fault}");
    }
    bail!("{} layout fault(s) in {}", report.faults().len(), path.display());
}

fn assemble(
    manifest_path: &Path,
    store_dir: &Path,
    output: &Path,
    gzip: bool,
    no_verify: bool,
) -> Result<()> {
    let manifest = load_manifest(manifest_path, gzip)?;
    let store = DirStore::new(store_dir);

    // Stage next to the output; it only appears once every chunk is written.
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let staged = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    let opts = ReassembleOptions { verify_layout: !no_verify };
    let report = {
        let mut out = BufWriter::new(staged.as_file());
        reassemble(&manifest, &store, &mut out, opts)
            .with_context(|| format!("assemble {}", manifest_path.display()))?
    };
    staged.persist(output).with_context(|| format!("write {}", output.display()))?;
    eprintln!(
        "Wrote {} bytes from {} chunk(s) to {}",
        report.bytes_written,
        report.chunks_written,
        output.display()
    );
    Ok(())
}

fn delete(manifest_path: &Path, store_dir: &Path, gzip: bool) -> Result<()> {
    let manifest = load_manifest(manifest_path, gzip)?;
    let store = DirStore::new(store_dir);
    let mut removed = 0usize;
    let mut missing = 0usize;
    for fid in manifest.deletion_set() {
        let path = store.path_for(fid)?;
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(%fid, "chunk already absent");
                missing += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }
    println!("Removed {removed} chunk(s), {missing} missing");
    Ok(())
}
