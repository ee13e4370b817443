use crate::artifacts::Artifacts;
use crate::error::Error;
use crate::loss::Criterion;
use crate::loss_log::{self, LossLog};
use crate::mnist::{MnistBatch, MnistBatcher, MnistItem, WIDTH};
use crate::model::{Autoencoder, AutoencoderConfig};
use crate::plot;
use burn::data::dataloader::{DataLoader, DataLoaderBuilder};
use burn::prelude::*;
use burn::{
    module::AutodiffModule,
    optim::{Adam, AdamConfig, GradientsParams, Optimizer, adaptor::OptimizerAdaptor},
    tensor::backend::AutodiffBackend,
};
use burn_dataset::Dataset;
use std::sync::Arc;

#[derive(Config)]
pub struct TrainingConfig {
    #[config(default = "optimizer_config()")]
    pub optimizer: AdamConfig,
    /// Outer repetitions, each followed by a plot and a checkpoint.
    #[config(default = 2)]
    pub num_loops: usize,
    /// Epochs per outer repetition.
    #[config(default = 5)]
    pub num_epochs: usize,
    #[config(default = 32)]
    pub batch_size: usize,
    /// `0` prepares batches on the training thread.
    #[config(default = 0)]
    pub num_workers: usize,
    #[config(default = 1e-3)]
    pub lr: f64,
    #[config(default = 0)]
    pub seed: u64,
    #[config(default = "Criterion::BinaryCrossEntropy")]
    pub criterion: Criterion,
    /// Columns of the reconstruction plot.
    #[config(default = 10)]
    pub num_samples: usize,
    /// Enlargement of each plotted image.
    #[config(default = 4)]
    pub plot_scale: u32,
}

// `AdamConfig` has no `Debug` impl in burn 0.18, so `#[derive(Debug)]` is not possible.
impl std::fmt::Debug for TrainingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// Adam with torch's defaults.
pub fn optimizer_config() -> AdamConfig {
    AdamConfig::new()
        .with_beta_1(0.9)
        .with_beta_2(0.999)
        .with_epsilon(1e-8)
}

pub type AutoencoderOptim<AutoB> = OptimizerAdaptor<Adam, Autoencoder<AutoB>, AutoB>;

pub type Dataloader<B> = Arc<dyn DataLoader<B, MnistBatch<B>>>;

/// What a training run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// `(global epoch, training loss)` for every epoch run, as written to the loss log.
    pub epoch_losses: Vec<(usize, f64)>,
    /// Average test loss after each outer repetition.
    pub test_losses: Vec<f64>,
}

/// Training loss of one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochLoss {
    /// `Σ(batch loss × batch length) / number of batches`, the figure logged per epoch.
    pub per_batch: f64,
    /// `Σ(batch loss × batch length) / number of items`.
    pub per_item: f64,
}

impl EpochLoss {
    fn from_sums(weighted_sum: f64, num_batches: usize, num_items: usize) -> Self {
        Self {
            per_batch: weighted_sum / num_batches.max(1) as f64,
            per_item: weighted_sum / num_items.max(1) as f64,
        }
    }
}

/// Where the run starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Start {
    /// Fresh weights and a truncated loss log.
    #[default]
    New,
    /// Weights and optimizer state from the artifacts directory, when present,
    /// with epoch numbering continuing the loss log.
    Resume,
}

pub fn train<AutoB, TrainSet, TestSet>(
    training_config: &TrainingConfig,
    model_config: &AutoencoderConfig,
    device: AutoB::Device,
    artifacts: &Artifacts,
    start: Start,
    train_set: TrainSet,
    test_set: TestSet,
) -> crate::error::Result<TrainingSummary>
where
    AutoB: AutodiffBackend,
    TrainSet: Dataset<MnistItem> + 'static,
    TestSet: Dataset<MnistItem> + 'static,
{
    if train_set.is_empty() {
        return Err(Error::EmptyDataset("training"));
    }
    if test_set.is_empty() {
        return Err(Error::EmptyDataset("test"));
    }
    AutoB::seed(training_config.seed);

    artifacts.save_config(&artifacts.training_config_path(), training_config)?;
    artifacts.save_config(&artifacts.model_config_path(), model_config)?;

    let optim = training_config.optimizer.init::<AutoB, Autoencoder<AutoB>>();
    let (mut model, mut optim, mut loss_file, epoch_offset) = match start {
        Start::New => (
            model_config.init::<AutoB>(&device),
            optim,
            LossLog::create(artifacts.loss_log_path())?,
            0,
        ),
        Start::Resume => {
            let model = match artifacts.load_model::<AutoB>(model_config, &device)? {
                Some(model) => model,
                None => {
                    log::info!("No checkpoint found, initializing a new model");
                    model_config.init::<AutoB>(&device)
                }
            };
            let optim = artifacts.load_optim::<AutoB, Autoencoder<AutoB>, _>(optim, &device)?;
            let offset = loss_log::last_epoch(&artifacts.loss_log_path())?.unwrap_or(0);
            (model, optim, LossLog::append(artifacts.loss_log_path())?, offset)
        }
    };
    log::info!("Logging epoch losses to {:?}", loss_file.path());
    log::info!("{model}");

    let dataloader_train: Dataloader<AutoB> =
        build_dataloader(training_config, device.clone(), train_set);
    let dataloader_test: Dataloader<AutoB::InnerBackend> =
        build_dataloader(training_config, device.clone(), test_set);

    let mut summary = TrainingSummary {
        epoch_losses: Vec::new(),
        test_losses: Vec::new(),
    };

    // plots continue the numbering of a resumed run
    let plot_offset = epoch_offset / training_config.num_epochs.max(1);

    for epoch_loop in 0..training_config.num_loops {
        for epoch in 1..training_config.num_epochs + 1 {
            let (trained, epoch_loss) = epoch_train::<AutoB>(
                Arc::clone(&dataloader_train),
                model,
                training_config,
                &mut optim,
            );
            model = trained;
            let train_loss = epoch_loss.per_batch;

            let real_epoch = epoch_offset + epoch + epoch_loop * training_config.num_epochs;
            log::info!("Epoch: {real_epoch} \tTraining Loss: {train_loss:.6}");
            log::debug!("Epoch: {real_epoch} \tMean Loss per Image: {:.6}", epoch_loss.per_item);
            loss_file.record(real_epoch, train_loss)?;
            summary.epoch_losses.push((real_epoch, train_loss));
        }

        let valid_model = model.valid();
        let test_loss = evaluate::<AutoB::InnerBackend>(
            Arc::clone(&dataloader_test),
            &valid_model,
            training_config.criterion,
        );
        log::info!("Test Loss: {test_loss:.6}");
        summary.test_losses.push(test_loss);

        plot_reconstructions::<AutoB::InnerBackend>(
            Arc::clone(&dataloader_test),
            &valid_model,
            training_config,
            &artifacts.reconstruction_path(plot_offset + epoch_loop + 1),
        )?;

        artifacts.save_model(&model)?;
        artifacts.save_optim(&optim)?;
    }

    log::info!("done!");
    Ok(summary)
}

fn build_dataloader<B, D>(
    training_config: &TrainingConfig,
    device: B::Device,
    dataset: D,
) -> Dataloader<B>
where
    B: Backend,
    D: Dataset<MnistItem> + 'static,
{
    let builder = DataLoaderBuilder::new(MnistBatcher::default())
        .batch_size(training_config.batch_size)
        .shuffle(training_config.seed)
        .set_device(device);
    let builder = if training_config.num_workers > 0 {
        builder.num_workers(training_config.num_workers)
    } else {
        builder
    };
    builder.build(dataset)
}

/// One pass over the training set; returns the updated model and the epoch's loss.
pub fn epoch_train<AutoB: AutodiffBackend>(
    dataloader_train: Dataloader<AutoB>,
    mut model: Autoencoder<AutoB>,
    training_config: &TrainingConfig,
    optim: &mut AutoencoderOptim<AutoB>,
) -> (Autoencoder<AutoB>, EpochLoss) {
    let mut loss_sum = 0.0;
    let mut num_batches = 0;
    let mut num_items = 0;

    for batch in dataloader_train.iter() {
        let input = batch.images;
        let [batch_size, _pixels] = input.dims();

        let output = model.forward(input.clone());
        let loss = training_config.criterion.forward(output, input);

        loss_sum += loss.clone().into_scalar().elem::<f64>() * batch_size as f64;
        num_batches += 1;
        num_items += batch_size;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(training_config.lr, model, grads);
    }

    (model, EpochLoss::from_sums(loss_sum, num_batches, num_items))
}

/// Mean per-image reconstruction loss over a whole dataloader.
pub fn evaluate<B: Backend>(
    dataloader: Dataloader<B>,
    model: &Autoencoder<B>,
    criterion: Criterion,
) -> f64 {
    let mut loss_sum = 0.0;
    let mut num_items = 0;
    for batch in dataloader.iter() {
        let input = batch.images;
        let [batch_size, _pixels] = input.dims();
        let loss = criterion.forward(model.forward(input.clone()), input);
        loss_sum += loss.into_scalar().elem::<f64>() * batch_size as f64;
        num_items += batch_size;
    }
    loss_sum / num_items.max(1) as f64
}

/// Reconstructs one shuffled test batch and saves the comparison plot.
fn plot_reconstructions<B: Backend>(
    dataloader_test: Dataloader<B>,
    model: &Autoencoder<B>,
    training_config: &TrainingConfig,
    path: &std::path::Path,
) -> crate::error::Result<()> {
    let Some(batch) = dataloader_test.iter().next() else {
        return Err(Error::EmptyDataset("test"));
    };
    let images = batch.images;
    let output = model.forward(images.clone());

    let originals = to_rows(images, training_config.num_samples)?;
    let reconstructions = to_rows(output, training_config.num_samples)?;
    plot::save_comparison(
        path,
        &originals,
        &reconstructions,
        WIDTH,
        training_config.plot_scale,
    )
}

/// Copies the first `limit` rows of a `[batch, pixels]` tensor to the host.
fn to_rows<B: Backend>(tensor: Tensor<B, 2>, limit: usize) -> crate::error::Result<Vec<Vec<f32>>> {
    let [batch_size, pixels] = tensor.dims();
    let rows = batch_size.min(limit);
    let values: Vec<f32> = tensor
        .narrow(0, 0, rows)
        .to_data()
        .convert::<f32>()
        .to_vec()?;
    Ok(values.chunks(pixels).map(|row| row.to_vec()).collect())
}
