// src/engine/api.rs
//
// Thumbnailer: the public entry point. Owns one engine and one firewall
// configuration and wires validate → resolve → transform together.

use crate::engine::backend::ImageEngine;
use crate::engine::firewall::FirewallConfig;
use crate::engine::native::NativeEngine;
use crate::engine::options::{resolve, ResolvedOptions};
use crate::engine::pipeline::{transform, Thumbnail};
use crate::engine::validate::validate;
use crate::error::Result;
use crate::ops::{Metadata, Options};
use rayon::prelude::*;
use tracing::debug;

/// Thumbnail producer for untrusted image bytes.
///
/// Usage:
/// ```no_run
/// use thumbgate::{Options, Thumbnailer};
///
/// # fn demo(upload: &[u8]) -> thumbgate::Result<()> {
/// let thumbnailer = Thumbnailer::default();
/// let thumb = thumbnailer.thumbnail(upload, &Options::crop(200, 200))?;
/// assert!(thumb.width <= 200 && thumb.height <= 200);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Thumbnailer<E: ImageEngine = NativeEngine> {
    engine: E,
    firewall: FirewallConfig,
}

impl Default for Thumbnailer<NativeEngine> {
    fn default() -> Self {
        Self::new(NativeEngine::new())
    }
}

impl<E: ImageEngine> Thumbnailer<E> {
    /// Create a thumbnailer with the firewall disabled.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            firewall: FirewallConfig::disabled(),
        }
    }

    pub fn with_firewall(mut self, firewall: FirewallConfig) -> Self {
        self.firewall = firewall;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn firewall(&self) -> &FirewallConfig {
        &self.firewall
    }

    /// Sniff, firewall and probe `blob`. The only way to obtain `Metadata`
    /// for untrusted bytes.
    pub fn validate(&self, blob: &[u8]) -> Result<Metadata> {
        validate(&self.engine, &self.firewall, blob)
    }

    pub fn resolve(&self, options: &Options, meta: &Metadata) -> Result<ResolvedOptions> {
        resolve(options, meta)
    }

    /// Run the pipeline. `blob` must be the bytes `resolved` was derived from.
    pub fn transform(&self, blob: &[u8], resolved: &ResolvedOptions) -> Result<Thumbnail> {
        transform(&self.engine, blob, resolved)
    }

    /// Validate, resolve and transform in one call.
    pub fn thumbnail(&self, blob: &[u8], options: &Options) -> Result<Thumbnail> {
        let meta = self.validate(blob)?;
        let resolved = self.resolve(options, &meta)?;
        self.transform(blob, &resolved)
    }

    /// Thumbnail independent requests in parallel on the rayon pool.
    /// Results come back in input order; one failure does not affect the
    /// others.
    pub fn process_batch<B>(&self, requests: &[(B, Options)]) -> Vec<Result<Thumbnail>>
    where
        B: AsRef<[u8]> + Sync,
    {
        debug!(count = requests.len(), "processing batch");
        requests
            .par_iter()
            .map(|(blob, options)| self.thumbnail(blob.as_ref(), options))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::backend::tests::{FailAt, FakeEngine, RecordedOp};
    use crate::engine::backend::Probe;
    use crate::error::ThumbgateError;
    use crate::ops::{Format, Orientation};

    const PNG_HEAD: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    fn png_engine(width: u32, height: u32) -> FakeEngine {
        FakeEngine::new(Probe {
            width,
            height,
            format: Format::Png,
            orientation: Orientation::Normal,
        })
    }

    #[test]
    fn test_thumbnail_end_to_end() {
        let thumbnailer = Thumbnailer::new(png_engine(800, 600));
        let thumb = thumbnailer
            .thumbnail(PNG_HEAD, &Options::fit(200, 200))
            .unwrap();
        assert_eq!((thumb.width, thumb.height), (200, 150));
        assert_eq!(thumb.format, Format::Png);
        assert_eq!(thumb.bytes, b"200x150.png");
    }

    #[test]
    fn test_validation_failure_skips_pipeline() {
        let thumbnailer = Thumbnailer::new(png_engine(800, 600));
        let err = thumbnailer
            .thumbnail(b"GIF8", &Options::fit(10, 10))
            .unwrap_err();
        assert!(matches!(err, ThumbgateError::UnknownFormat { .. }));
        assert_eq!(thumbnailer.engine().decodes(), 0);
    }

    #[test]
    fn test_firewall_applies() {
        let thumbnailer = Thumbnailer::new(png_engine(800, 600))
            .with_firewall(FirewallConfig::custom().with_max_bytes(4));
        let err = thumbnailer.validate(PNG_HEAD).unwrap_err();
        assert!(matches!(err, ThumbgateError::TooBig { .. }));
        assert_eq!(thumbnailer.firewall().max_bytes, Some(4));
    }

    #[test]
    fn test_process_batch_keeps_order_and_isolates_failures() {
        let thumbnailer = Thumbnailer::new(png_engine(800, 600));
        let requests: Vec<(Vec<u8>, Options)> = vec![
            (PNG_HEAD.to_vec(), Options::fit(100, 100)),
            (b"not an image".to_vec(), Options::fit(100, 100)),
            (PNG_HEAD.to_vec(), Options::crop(50, 50)),
            (
                PNG_HEAD.to_vec(),
                Options {
                    quality: 101,
                    ..Options::default()
                },
            ),
        ];
        let results = thumbnailer.process_batch(&requests);
        assert_eq!(results.len(), 4);
        let first = results[0].as_ref().unwrap();
        assert_eq!((first.width, first.height), (100, 75));
        assert!(matches!(results[1], Err(ThumbgateError::UnknownFormat { .. })));
        let third = results[2].as_ref().unwrap();
        assert_eq!((third.width, third.height), (50, 50));
        assert!(matches!(results[3], Err(ThumbgateError::BadOption { .. })));

        let engine = thumbnailer.engine();
        assert_eq!(engine.decodes(), 2);
        assert_eq!(engine.count(&RecordedOp::Release), 2);
    }

    #[test]
    fn test_batch_releases_on_stage_failure() {
        let thumbnailer = Thumbnailer::new(png_engine(800, 600).failing_at(FailAt::Encode));
        let requests = vec![(PNG_HEAD, Options::fit(10, 10)); 8];
        let results = thumbnailer.process_batch(&requests);
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(ThumbgateError::StageFailed { .. }))));
        let engine = thumbnailer.engine();
        assert_eq!(engine.count(&RecordedOp::Release), engine.decodes());
        assert_eq!(engine.decodes(), 8);
    }
}
