//! MNIST download, IDX decoding and batching.
//!
//! Images are kept as flat `[WIDTH * HEIGHT]` vectors of brightness in `[0, 1]`,
//! which is the range the decoder's sigmoid produces.

use crate::error::{Error, Result};
use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use burn_common::network::downloader::download_file_as_bytes;
use burn_dataset::{
    Dataset, InMemDataset,
    transform::{Mapper, MapperDataset},
};
use flate2::read::GzDecoder;
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

// CVDF mirror of http://yann.lecun.com/exdb/mnist/
const URL: &str = "https://storage.googleapis.com/cvdf-datasets/mnist/";
const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;

pub const WIDTH: usize = 28;
pub const HEIGHT: usize = 28;
pub const PIXELS: usize = WIDTH * HEIGHT;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    fn images_file(self) -> &'static str {
        match self {
            Split::Train => TRAIN_IMAGES,
            Split::Test => TEST_IMAGES,
        }
    }

    fn labels_file(self) -> &'static str {
        match self {
            Split::Train => TRAIN_LABELS,
            Split::Test => TEST_LABELS,
        }
    }
}

/// MNIST item.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MnistItem {
    /// Image as a flat array of brightness values in between 0.0 and 1.0.
    ///
    /// # Shape
    /// [WIDTH * HEIGHT]
    pub image: Vec<f32>,

    /// Label of the image, in between 0 and 9. Not used for reconstruction.
    pub label: u8,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MnistItemRaw {
    pub image_bytes: Vec<u8>,
    pub label: u8,
}

pub struct BytesToImage;

impl Mapper<MnistItemRaw, MnistItem> for BytesToImage {
    fn map(&self, item: &MnistItemRaw) -> MnistItem {
        debug_assert_eq!(item.image_bytes.len(), PIXELS);

        let image = item
            .image_bytes
            .iter()
            .map(|brightness| {
                let value: f32 = (*brightness).as_();
                value / 255.0
            })
            .collect();

        MnistItem {
            image,
            label: item.label,
        }
    }
}

type MappedDataset = MapperDataset<InMemDataset<MnistItemRaw>, BytesToImage, MnistItemRaw>;

/// The 60 000 training or 10 000 test images of MNIST, held in memory.
pub struct MnistDataset {
    dataset: MappedDataset,
}

impl Dataset<MnistItem> for MnistDataset {
    fn get(&self, index: usize) -> Option<MnistItem> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl MnistDataset {
    /// Training split, downloaded into `cache_dir` when missing.
    pub fn train(cache_dir: &Path) -> Result<Self> {
        Self::new(Split::Train, cache_dir)
    }

    /// Test split, downloaded into `cache_dir` when missing.
    pub fn test(cache_dir: &Path) -> Result<Self> {
        Self::new(Split::Test, cache_dir)
    }

    pub fn new(split: Split, cache_dir: &Path) -> Result<Self> {
        let split_dir = download(split, cache_dir)?;

        let images_path = split_dir.join(split.images_file());
        let labels_path = split_dir.join(split.labels_file());
        let images = read_file(&images_path)?;
        let labels = read_file(&labels_path)?;
        let images =
            parse_images(&images).map_err(|reason| Error::invalid_idx(&images_path, reason))?;
        let labels =
            parse_labels(&labels).map_err(|reason| Error::invalid_idx(&labels_path, reason))?;
        if images.len() != labels.len() {
            return Err(Error::invalid_idx(
                &labels_path,
                format!("{} labels for {} images", labels.len(), images.len()),
            ));
        }
        log::debug!("loaded {} {} images", images.len(), split.dir_name());

        Ok(Self::from_raw(
            images
                .into_iter()
                .zip(labels)
                .map(|(image_bytes, label)| MnistItemRaw { image_bytes, label })
                .collect(),
        ))
    }

    /// Builds a dataset from already decoded items.
    pub fn from_raw(items: Vec<MnistItemRaw>) -> Self {
        let dataset = MapperDataset::new(InMemDataset::new(items), BytesToImage);
        Self { dataset }
    }
}

/// Default location of the downloaded files, shared with burn-dataset's cache.
pub fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cache")
        .join("burn-dataset")
}

/// Downloads (if needed) the files of a split, returning the directory holding them.
fn download(split: Split, cache_dir: &Path) -> Result<PathBuf> {
    let split_dir = cache_dir.join("mnist").join(split.dir_name());
    create_dir_all(&split_dir).map_err(|e| Error::io(&split_dir, e))?;

    download_file(split.images_file(), &split_dir)?;
    download_file(split.labels_file(), &split_dir)?;

    Ok(split_dir)
}

fn download_file(name: &str, dest_dir: &Path) -> Result<PathBuf> {
    let file_name = dest_dir.join(name);

    if !file_name.exists() {
        log::info!("downloading {name}");
        let bytes = download_file_as_bytes(&format!("{URL}{name}.gz"), name);

        let mut output_file = File::create(&file_name).map_err(|e| Error::io(&file_name, e))?;
        let mut gz_buffer = GzDecoder::new(&bytes[..]);
        if let Err(e) = std::io::copy(&mut gz_buffer, &mut output_file) {
            // a partial file would be mistaken for a complete download next time
            let _ = std::fs::remove_file(&file_name);
            return Err(Error::io(&file_name, e));
        }
    }

    Ok(file_name)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::io(path, e))
}

fn be_u32(bytes: &[u8], offset: usize) -> std::result::Result<u32, String> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| format!("header truncated at byte {offset}"))
}

/// Decodes an IDX3 image file into one `WIDTH * HEIGHT` byte vector per image.
pub fn parse_images(bytes: &[u8]) -> std::result::Result<Vec<Vec<u8>>, String> {
    let magic = be_u32(bytes, 0)?;
    if magic != IMAGES_MAGIC {
        return Err(format!("bad image magic {magic:#010x}"));
    }
    let count = be_u32(bytes, 4)? as usize;
    let rows = be_u32(bytes, 8)? as usize;
    let cols = be_u32(bytes, 12)? as usize;
    if (rows, cols) != (HEIGHT, WIDTH) {
        return Err(format!("expected {HEIGHT}x{WIDTH} images, found {rows}x{cols}"));
    }

    let body = &bytes[16..];
    if body.len() < count * PIXELS {
        return Err(format!(
            "expected {} pixel bytes, found {}",
            count * PIXELS,
            body.len()
        ));
    }

    Ok(body[..count * PIXELS]
        .chunks(PIXELS)
        .map(|chunk| chunk.to_vec())
        .collect())
}

/// Decodes an IDX1 label file.
pub fn parse_labels(bytes: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let magic = be_u32(bytes, 0)?;
    if magic != LABELS_MAGIC {
        return Err(format!("bad label magic {magic:#010x}"));
    }
    let count = be_u32(bytes, 4)? as usize;
    let body = &bytes[8..];
    if body.len() < count {
        return Err(format!("expected {count} labels, found {}", body.len()));
    }
    Ok(body[..count].to_vec())
}

#[derive(Clone, Default)]
pub struct MnistBatcher {}

#[derive(Clone, Debug)]
pub struct MnistBatch<B: Backend> {
    /// Flattened brightness in `[0, 1]`.
    ///
    /// # Shape
    /// [batch_size, WIDTH * HEIGHT]
    pub images: Tensor<B, 2>,
    /// # Shape
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, MnistItem, MnistBatch<B>> for MnistBatcher {
    fn batch(&self, items: Vec<MnistItem>, device: &B::Device) -> MnistBatch<B> {
        let (items_image, items_label): (Vec<_>, Vec<_>) = items
            .into_iter()
            .map(|item| (item.image, item.label))
            .unzip();

        let images = items_image
            .into_iter()
            .map(|image| TensorData::new(image, [1, PIXELS]).convert::<B::FloatElem>())
            .map(|data| Tensor::<B, 2>::from_data(data, device))
            .collect();

        let targets = items_label
            .into_iter()
            .map(|label| {
                Tensor::<B, 1, Int>::from_data([(label as i64).elem::<B::IntElem>()], device)
            })
            .collect();

        MnistBatch {
            images: Tensor::cat(images, 0),
            targets: Tensor::cat(targets, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn idx_images(count: u32, rows: u32, cols: u32, pixels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&IMAGES_MAGIC.to_be_bytes());
        bytes.extend_from_slice(&count.to_be_bytes());
        bytes.extend_from_slice(&rows.to_be_bytes());
        bytes.extend_from_slice(&cols.to_be_bytes());
        bytes.extend_from_slice(pixels);
        bytes
    }

    #[test]
    fn parses_well_formed_images() {
        let mut pixels = vec![0u8; PIXELS * 2];
        pixels[PIXELS] = 255;
        let images = parse_images(&idx_images(2, 28, 28, &pixels)).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].len(), PIXELS);
        assert_eq!(images[1][0], 255);
    }

    #[test]
    fn rejects_bad_image_headers() {
        let pixels = vec![0u8; PIXELS];
        let mut wrong_magic = idx_images(1, 28, 28, &pixels);
        wrong_magic[3] = 0x01;
        assert!(parse_images(&wrong_magic).is_err());
        assert!(parse_images(&idx_images(1, 32, 32, &pixels)).is_err());
        assert!(parse_images(&idx_images(2, 28, 28, &pixels)).is_err());
        assert!(parse_images(&[0, 0, 8]).is_err());
    }

    #[test]
    fn parses_labels() {
        let mut bytes = LABELS_MAGIC.to_be_bytes().to_vec();
        bytes.extend_from_slice(&3u32.to_be_bytes());
        bytes.extend_from_slice(&[7, 2, 1]);
        assert_eq!(parse_labels(&bytes).unwrap(), vec![7, 2, 1]);

        bytes.truncate(10);
        assert!(parse_labels(&bytes).is_err());
    }

    #[test]
    fn scales_pixels_to_unit_range() {
        let mut image_bytes = vec![0u8; PIXELS];
        image_bytes[0] = 255;
        image_bytes[1] = 51;
        let dataset = MnistDataset::from_raw(vec![MnistItemRaw {
            image_bytes,
            label: 4,
        }]);
        let item = dataset.get(0).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(item.label, 4);
        assert_eq!(item.image[0], 1.0);
        assert!((item.image[1] - 0.2).abs() < 1e-6);
        assert_eq!(item.image[2], 0.0);
    }

    #[test]
    fn batches_flat_images() {
        let device = Default::default();
        let items = (0..3)
            .map(|i| MnistItem {
                image: vec![i as f32 / 10.0; PIXELS],
                label: i,
            })
            .collect();
        let batch: MnistBatch<NdArray> = MnistBatcher::default().batch(items, &device);
        assert_eq!(batch.images.dims(), [3, PIXELS]);
        assert_eq!(batch.targets.dims(), [3]);
        let targets: Vec<i64> = batch.targets.to_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(targets, vec![0, 1, 2]);
    }
}
