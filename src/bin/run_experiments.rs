use home_rover::experiments::runner::{ExperimentConfig, run_batch_and_save};

fn main() {
    env_logger::init();

    let mut cfg = ExperimentConfig::default();
    cfg.episodes = 20;

    println!("Running {} scripted episodes...", cfg.episodes);
    match run_batch_and_save(&cfg) {
        Ok(path) => println!("  -> Results written to {:?}", path),
        Err(e) => eprintln!("  -> Failed to run experiments: {e}"),
    }
}
