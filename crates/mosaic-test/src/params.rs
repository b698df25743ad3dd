//! Regression test parameters and comparisons

use mosaic_core::PixelPacket;

/// Regression test mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegTestMode {
    /// Report failures only (default)
    #[default]
    Compare,
    /// Also report passing comparisons
    Display,
}

impl RegTestMode {
    /// Parse mode from the `REGTEST_MODE` environment variable
    pub fn from_env() -> Self {
        match std::env::var("REGTEST_MODE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "display" => Self::Display,
            _ => Self::Compare,
        }
    }
}

/// Regression test parameters
///
/// Tracks the test name, the running comparison index and every failure
/// seen so far.
pub struct RegParams {
    /// Name of the test (e.g., "cache")
    pub test_name: String,
    /// Current comparison index (incremented before each comparison)
    index: usize,
    /// Test mode
    pub mode: RegTestMode,
    success: bool,
    failures: Vec<String>,
}

impl RegParams {
    /// Create new regression test parameters, configured from
    /// `REGTEST_MODE`.
    pub fn new(test_name: &str) -> Self {
        let mode = RegTestMode::from_env();

        eprintln!();
        eprintln!("////////////////////////////////////////////////");
        eprintln!("////////////////   {}_reg   ///////////////", test_name);
        eprintln!("////////////////////////////////////////////////");
        eprintln!("Mode: {:?}", mode);

        Self {
            test_name: test_name.to_string(),
            index: 0,
            mode,
            success: true,
            failures: Vec::new(),
        }
    }

    /// Get the current comparison index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Check if in display mode
    pub fn display(&self) -> bool {
        self.mode == RegTestMode::Display
    }

    fn fail(&mut self, msg: String) -> bool {
        eprintln!("{}", msg);
        self.failures.push(msg);
        self.success = false;
        false
    }

    fn pass(&self, what: &str) -> bool {
        if self.display() {
            eprintln!("{}_reg: {} comparison {} ok", self.test_name, what, self.index);
        }
        true
    }

    /// Compare two floating-point values
    ///
    /// # Arguments
    ///
    /// * `expected` - Expected value
    /// * `actual` - Actual computed value
    /// * `delta` - Maximum allowed difference
    pub fn compare_values(&mut self, expected: f64, actual: f64, delta: f64) -> bool {
        self.index += 1;
        let diff = (expected - actual).abs();

        if diff > delta || diff.is_nan() {
            let msg = format!(
                "Failure in {}_reg: value comparison for index {}\n\
                 difference = {} but allowed delta = {}\n\
                 expected = {}, actual = {}",
                self.test_name, self.index, diff, delta, expected, actual
            );
            self.fail(msg)
        } else {
            self.pass("value")
        }
    }

    /// Compare two pixel runs, allowing each sample to differ by `delta`
    pub fn compare_pixels(
        &mut self,
        expected: &[PixelPacket],
        actual: &[PixelPacket],
        delta: u64,
    ) -> bool {
        self.index += 1;

        if expected.len() != actual.len() {
            let msg = format!(
                "Failure in {}_reg: pixel comparison for index {} - length {} vs {}",
                self.test_name,
                self.index,
                expected.len(),
                actual.len()
            );
            return self.fail(msg);
        }

        let off = |a: u64, b: u64| a.abs_diff(b) > delta;
        for (i, (e, a)) in expected.iter().zip(actual).enumerate() {
            if off(e.red as u64, a.red as u64)
                || off(e.green as u64, a.green as u64)
                || off(e.blue as u64, a.blue as u64)
                || off(e.opacity as u64, a.opacity as u64)
            {
                let msg = format!(
                    "Failure in {}_reg: pixel comparison for index {} - mismatch at {}\n\
                     expected = {:?}, actual = {:?}",
                    self.test_name, self.index, i, e, a
                );
                return self.fail(msg);
            }
        }

        self.pass("pixel")
    }

    /// Compare two byte arrays for equality
    pub fn compare_bytes(&mut self, expected: &[u8], actual: &[u8]) -> bool {
        self.index += 1;

        if expected != actual {
            let first = expected
                .iter()
                .zip(actual)
                .position(|(a, b)| a != b)
                .unwrap_or(expected.len().min(actual.len()));
            let msg = format!(
                "Failure in {}_reg: byte comparison for index {}\n\
                 sizes: {} vs {}, first difference at {}",
                self.test_name,
                self.index,
                expected.len(),
                actual.len(),
                first
            );
            self.fail(msg)
        } else {
            self.pass("byte")
        }
    }

    /// Clean up and report results
    ///
    /// # Returns
    ///
    /// `true` if all comparisons passed.
    pub fn cleanup(self) -> bool {
        if self.success {
            eprintln!("SUCCESS: {}_reg", self.test_name);
        } else {
            eprintln!("FAILURE: {}_reg", self.test_name);
            for failure in &self.failures {
                eprintln!("  {}", failure);
            }
        }
        eprintln!();

        self.success
    }

    /// Check if all comparisons have passed so far
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Get list of failures
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}
