use std::env;
use std::path::Path;
use std::path::PathBuf;

use rand::distr::Alphanumeric;
use rand::distr::SampleString;

/// A randomly named directory under the system temp dir, so tests touching
/// the filesystem can run in parallel. Not created until something writes
/// to it.
pub(crate) fn unit_test_dir() -> PathBuf {
    let mut rng = rand::rng();
    let user = env::var("USER").unwrap_or_else(|_| "default".to_string());
    env::temp_dir()
        .join(format!("shielded-terminal-unit-tests-{}", user))
        .join(Path::new(&Alphanumeric.sample_string(&mut rng, 16)))
}
