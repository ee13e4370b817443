use burn::tensor::backend::AutodiffBackend;
use burn_autoencoder::{
    artifacts::Artifacts,
    backend::{MainAutoBackend, MainDevice},
    cli::{AppArgs, HELP},
    mnist::{self, MnistDataset},
    training,
};
use burn_dataset::Dataset;

fn launch<AutoB: AutodiffBackend + MainDevice>(args: &AppArgs) -> burn_autoencoder::Result<()> {
    let artifacts = Artifacts::new(&args.artifacts_path)?;
    log::info!("Writing artifacts to {:?}", artifacts.dir());
    let training_config = args.training_config(&artifacts)?;
    let model_config = args.model_config(&artifacts)?;

    let data_dir = args.data_dir.clone().unwrap_or_else(mnist::default_cache_dir);
    let train_set = MnistDataset::train(&data_dir)?;
    let test_set = MnistDataset::test(&data_dir)?;
    log::info!(
        "{} training and {} test images",
        train_set.len(),
        test_set.len()
    );

    let device = AutoB::main_device();
    training::train::<AutoB, _, _>(
        &training_config,
        &model_config,
        device,
        &artifacts,
        args.start(),
        train_set,
        test_set,
    )?;
    Ok(())
}

fn main() -> burn_autoencoder::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = AppArgs::parse()?;
    if args.help {
        println!("{HELP}");
        return Ok(());
    }
    launch::<MainAutoBackend>(&args)
}
