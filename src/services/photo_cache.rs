use std::fs;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::UNIX_EPOCH;

use image::GenericImageView;
use tracing::{info, warn};

const PHOTO_CACHE_MAGIC: &[u8] = b"FOZLAVA_GALLERY_CACHE_V1";

const PHOTO_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Clone)]
pub struct DecodedPhoto {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

pub enum GalleryEvent {
    Started {
        total: usize,
    },
    Decoded {
        path: PathBuf,
        photo: Option<DecodedPhoto>,
    },
    Finished {
        completed: usize,
        total: usize,
        ok: usize,
        miss: usize,
    },
    Failed {
        message: String,
    },
}

/// Image files directly inside the gallery folder, name-sorted so the
/// grid is stable across runs.
pub fn list_gallery_photos(gallery_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(gallery_dir) else {
        warn!("gallery folder missing: {}", gallery_dir.display());
        return Vec::new();
    };

    let mut photos: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| {
                        PHOTO_EXTENSIONS
                            .iter()
                            .any(|known| ext.eq_ignore_ascii_case(known))
                    })
        })
        .collect();
    photos.sort();
    photos
}

pub fn photo_cache_root(cache_root: &Path) -> PathBuf {
    cache_root.join("gallery")
}

pub fn cache_path_for_photo(cache_root: &Path, source_path: &Path, max_dimension: u32) -> PathBuf {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    source_path.to_string_lossy().hash(&mut hasher);
    let key = hasher.finish();
    cache_root.join(format!("photo_{key:016x}_{max_dimension}.bin"))
}

/// Decode through the disk cache: a hit keyed on the source file's
/// (size, mtime) stamp skips the decode entirely.
pub fn decode_photo_cached(
    source_path: &Path,
    max_dimension: u32,
    cache_path: &Path,
) -> Option<DecodedPhoto> {
    let stamp = source_file_stamp(source_path)?;
    if let Some(cached) = try_load_cached_photo(cache_path, stamp) {
        return Some(cached);
    }

    let decoded = decode_photo(source_path, max_dimension)?;
    let _ = save_cached_photo(cache_path, stamp, &decoded);
    Some(decoded)
}

pub fn decode_photo(path: &Path, max_dimension: u32) -> Option<DecodedPhoto> {
    let bytes = fs::read(path).ok()?;
    let mut decoded = image::load_from_memory(&bytes).ok()?;
    let (width, height) = decoded.dimensions();
    if width.max(height) > max_dimension {
        decoded = decoded.resize(
            max_dimension,
            max_dimension,
            image::imageops::FilterType::Triangle,
        );
    }
    let rgba = decoded.to_rgba8();
    Some(DecodedPhoto {
        width: rgba.width() as usize,
        height: rgba.height() as usize,
        rgba: rgba.into_raw(),
    })
}

/// Decode every gallery photo on a worker, streaming each one back as
/// it completes so the grid fills in progressively.
pub fn spawn_gallery_decode(
    gallery_dir: PathBuf,
    cache_root: PathBuf,
    max_dimension: u32,
) -> Receiver<GalleryEvent> {
    let (tx, rx) = mpsc::channel::<GalleryEvent>();

    thread::spawn(move || {
        let photos = list_gallery_photos(&gallery_dir);
        let total = photos.len();
        let _ = tx.send(GalleryEvent::Started { total });

        let worker_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .clamp(1, 4);

        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = tx.send(GalleryEvent::Failed {
                    message: format!("failed to initialize gallery decode runtime: {err}"),
                });
                return;
            }
        };

        let tx_progress = tx.clone();
        let (ok, miss, completed) = runtime.block_on(async move {
            let mut ok = 0usize;
            let mut miss = 0usize;
            let mut completed = 0usize;
            let max_jobs = worker_threads.max(1);

            let mut pending: Vec<(PathBuf, tokio::task::JoinHandle<Option<DecodedPhoto>>)> =
                Vec::with_capacity(max_jobs);

            for photo_path in photos {
                let cache_path =
                    cache_path_for_photo(&cache_root, &photo_path, max_dimension);
                let decode_path = photo_path.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    decode_photo_cached(&decode_path, max_dimension, &cache_path)
                });
                pending.push((photo_path, handle));

                if pending.len() >= max_jobs {
                    let (path, handle) = pending.remove(0);
                    let photo = handle.await.ok().flatten();
                    if photo.is_some() {
                        ok += 1;
                    } else {
                        miss += 1;
                    }
                    completed += 1;
                    let _ = tx_progress.send(GalleryEvent::Decoded { path, photo });
                }
            }

            while !pending.is_empty() {
                let (path, handle) = pending.remove(0);
                let photo = handle.await.ok().flatten();
                if photo.is_some() {
                    ok += 1;
                } else {
                    miss += 1;
                }
                completed += 1;
                let _ = tx_progress.send(GalleryEvent::Decoded { path, photo });
            }

            (ok, miss, completed)
        });

        info!(
            "Gallery decode finished: completed={}, ok={}, miss={}",
            completed, ok, miss
        );
        let _ = tx.send(GalleryEvent::Finished {
            completed,
            total,
            ok,
            miss,
        });
    });

    rx
}

fn source_file_stamp(path: &Path) -> Option<(u64, u64)> {
    let meta = fs::metadata(path).ok()?;
    let file_len = meta.len();
    let mtime = meta
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .ok()?
        .as_secs();
    Some((file_len, mtime))
}

fn try_load_cached_photo(cache_path: &Path, expected_stamp: (u64, u64)) -> Option<DecodedPhoto> {
    let mut file = fs::File::open(cache_path).ok()?;
    let mut magic = vec![0u8; PHOTO_CACHE_MAGIC.len()];
    file.read_exact(&mut magic).ok()?;
    if magic != PHOTO_CACHE_MAGIC {
        return None;
    }

    let width = read_u32_le(&mut file)? as usize;
    let height = read_u32_le(&mut file)? as usize;
    let src_len = read_u64_le(&mut file)?;
    let src_mtime = read_u64_le(&mut file)?;
    if (src_len, src_mtime) != expected_stamp {
        return None;
    }

    let pixel_len = width.checked_mul(height)?.checked_mul(4)?;
    let mut rgba = vec![0u8; pixel_len];
    file.read_exact(&mut rgba).ok()?;

    Some(DecodedPhoto {
        width,
        height,
        rgba,
    })
}

fn save_cached_photo(
    cache_path: &Path,
    stamp: (u64, u64),
    photo: &DecodedPhoto,
) -> std::io::Result<()> {
    if let Some(parent) = cache_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(cache_path)?;
    file.write_all(PHOTO_CACHE_MAGIC)?;
    file.write_all(&(photo.width as u32).to_le_bytes())?;
    file.write_all(&(photo.height as u32).to_le_bytes())?;
    file.write_all(&stamp.0.to_le_bytes())?;
    file.write_all(&stamp.1.to_le_bytes())?;
    file.write_all(&photo.rgba)?;
    Ok(())
}

fn read_u32_le(file: &mut fs::File) -> Option<u32> {
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf).ok()?;
    Some(u32::from_le_bytes(buf))
}

fn read_u64_le(file: &mut fs::File) -> Option<u64> {
    let mut buf = [0u8; 8];
    file.read_exact(&mut buf).ok()?;
    Some(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fozlava-gallery-test-{}-{}",
            std::process::id(),
            DIR_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn gallery_listing_keeps_only_images_sorted() {
        let dir = scratch_dir();
        fs::write(dir.join("b.png"), b"x").unwrap();
        fs::write(dir.join("a.JPG"), b"x").unwrap();
        fs::write(dir.join("notes.txt"), b"x").unwrap();
        fs::create_dir_all(dir.join("sub.png")).unwrap();

        let photos = list_gallery_photos(&dir);
        let names: Vec<_> = photos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png"]);
    }

    #[test]
    fn missing_gallery_folder_is_empty_not_an_error() {
        let dir = scratch_dir().join("does-not-exist");
        assert!(list_gallery_photos(&dir).is_empty());
    }

    #[test]
    fn cached_photo_round_trips_and_rejects_stale_stamp() {
        let dir = scratch_dir();
        let cache_path = dir.join("entry.bin");
        let photo = DecodedPhoto {
            width: 2,
            height: 2,
            rgba: vec![7u8; 16],
        };

        save_cached_photo(&cache_path, (123, 456), &photo).unwrap();
        let loaded = try_load_cached_photo(&cache_path, (123, 456)).unwrap();
        assert_eq!(loaded.width, 2);
        assert_eq!(loaded.rgba, photo.rgba);

        // Source file changed since the entry was written.
        assert!(try_load_cached_photo(&cache_path, (123, 999)).is_none());
    }

    #[test]
    fn decode_resizes_down_to_max_dimension() {
        let dir = scratch_dir();
        let source = dir.join("photo.png");
        let img = image::RgbaImage::from_pixel(8, 4, image::Rgba([200, 10, 10, 255]));
        img.save(&source).unwrap();

        let decoded = decode_photo(&source, 4).unwrap();
        assert!(decoded.width <= 4 && decoded.height <= 4);
        assert_eq!(decoded.rgba.len(), decoded.width * decoded.height * 4);

        let cache_path = cache_path_for_photo(&dir, &source, 4);
        let via_cache = decode_photo_cached(&source, 4, &cache_path).unwrap();
        assert_eq!(via_cache.rgba, decoded.rgba);
        assert!(cache_path.exists());
    }
}
