use std::fs;
use std::path::PathBuf;

use clap::Parser;
use slidegen_core::WindowModel;

/// Train a sliding-window character model on a corpus and generate text.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
	/// Path to the training corpus (plain text).
	corpus: PathBuf,

	/// Context window length in characters.
	#[arg(short, long, default_value_t = 5)]
	window: usize,

	/// Text to start generation from; its trailing window characters
	/// seed the walk.
	#[arg(short, long)]
	seed_text: String,

	/// Number of characters to generate.
	#[arg(short, long, default_value_t = 200)]
	length: usize,

	/// Fix the random source for reproducible output.
	#[arg(long)]
	seed: Option<u64>,

	/// Count corpus shards on all cores instead of a single pass.
	#[arg(long)]
	parallel: bool,

	/// Print the trained table before the generated text.
	#[arg(long)]
	dump: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::init();
	let args = Args::parse();

	let mut model = match args.seed {
		Some(seed) => WindowModel::with_seed(args.window, seed)?,
		None => WindowModel::new(args.window)?,
	};

	let corpus = fs::read_to_string(&args.corpus)?;
	if args.parallel {
		model.train_parallel(&corpus)?;
	} else {
		model.train(corpus.chars())?;
	}
	log::info!(
		"trained on {} characters, {} distinct windows",
		corpus.chars().count(),
		model.window_count()
	);

	if args.dump {
		print!("{}", model);
	}

	println!("{}", model.generate(&args.seed_text, args.length));
	Ok(())
}
