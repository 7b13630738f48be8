//! Common test utilities module
//!
//! Deterministic synthetic datasets and temporary file helpers shared by
//! the integration tests.

#![allow(dead_code)]

use lmfold::DataFrame;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Simple LCG so generated data is identical on every run
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed)
    }

    /// Uniform value in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) as f64 / (1u64 << 31) as f64
    }
}

/// Bottle-sample style dataset.
///
/// `o2sat` is a linear function of `temp`, `salinity`, `phosphate` and
/// `depth` plus uniform noise of width `noise`. `chlorophyll` is unrelated
/// to the response.
pub fn seawater_frame(n: usize, noise: f64, seed: u64) -> DataFrame {
    let mut rng = Lcg::new(seed);
    let mut temp = Vec::with_capacity(n);
    let mut salinity = Vec::with_capacity(n);
    let mut phosphate = Vec::with_capacity(n);
    let mut depth = Vec::with_capacity(n);
    let mut chlorophyll = Vec::with_capacity(n);
    let mut o2sat = Vec::with_capacity(n);

    for _ in 0..n {
        let t = 4.0 + 16.0 * rng.next_f64();
        let s = 33.0 + 1.5 * rng.next_f64();
        let p = 0.2 + 2.5 * rng.next_f64();
        let d = 500.0 * rng.next_f64();
        let c = rng.next_f64();
        let e = noise * (rng.next_f64() - 0.5);

        temp.push(t);
        salinity.push(s);
        phosphate.push(p);
        depth.push(d);
        chlorophyll.push(c);
        o2sat.push(140.0 + 1.2 * t - 2.0 * s - 18.0 * p - 0.04 * d + e);
    }

    DataFrame::from_columns(vec![
        ("temp", temp),
        ("salinity", salinity),
        ("phosphate", phosphate),
        ("depth", depth),
        ("chlorophyll", chlorophyll),
        ("o2sat", o2sat),
    ])
    .expect("synthetic frame has consistent columns")
}

/// Temporary directory removed when the guard drops
pub struct TempTestDir {
    dir: TempDir,
}

impl TempTestDir {
    pub fn new() -> Self {
        TempTestDir {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    /// Writes `contents` to `name` inside the directory and returns its path
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("Failed to write test file");
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
