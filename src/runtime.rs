//! Optional process-wide device context.
//!
//! Library code takes a [`DeviceContext`] by reference; this module only
//! offers a shared instance for callers that want one.

use crate::config::Config;
use crate::device::DeviceContext;
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;

static GLOBAL_CONTEXT: RwLock<Option<Arc<DeviceContext>>> = RwLock::new(None);

pub fn init() -> Result<()> {
    init_with_config(Config::default())
}

pub fn init_with_config(config: Config) -> Result<()> {
    let mut global = GLOBAL_CONTEXT.write();
    if global.is_some() {
        return Err(Error::AlreadyInitialized);
    }

    *global = Some(Arc::new(DeviceContext::new(config)?));
    Ok(())
}

/// The shared context, if [`init`] has run.
pub fn context() -> Result<Arc<DeviceContext>> {
    GLOBAL_CONTEXT
        .read()
        .as_ref()
        .cloned()
        .ok_or(Error::NotInitialized)
}

/// The shared context, creating it with default settings on first use.
pub fn get_or_init() -> Result<Arc<DeviceContext>> {
    {
        let global = GLOBAL_CONTEXT.read();
        if let Some(ctx) = global.as_ref() {
            return Ok(Arc::clone(ctx));
        }
    }

    let mut global = GLOBAL_CONTEXT.write();
    if let Some(ctx) = global.as_ref() {
        return Ok(Arc::clone(ctx));
    }

    let ctx = Arc::new(DeviceContext::new(Config::default())?);
    *global = Some(Arc::clone(&ctx));
    Ok(ctx)
}

/// Drop the shared context. Outstanding `Arc`s keep it alive until released.
pub fn shutdown() {
    let previous = GLOBAL_CONTEXT.write().take();
    drop(previous);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    // the global is process-wide; keep these tests from interleaving
    static SERIAL: Mutex<()> = Mutex::new(());

    #[test]
    fn test_runtime_init() {
        let _guard = SERIAL.lock();
        shutdown();

        assert!(matches!(context(), Err(Error::NotInitialized)));
        assert!(init().is_ok());
        assert!(matches!(init(), Err(Error::AlreadyInitialized)));
        assert!(context().is_ok());

        shutdown();
    }

    #[test]
    fn test_custom_config() {
        let _guard = SERIAL.lock();
        shutdown();

        let config = Config::builder().queue_threads(2).build().unwrap();
        init_with_config(config).unwrap();

        let ctx = context().unwrap();
        assert_eq!(ctx.info().compute_units, 2);

        shutdown();
    }

    #[test]
    fn test_get_or_init_reuses() {
        let _guard = SERIAL.lock();
        shutdown();

        let a = get_or_init().unwrap();
        let b = get_or_init().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        shutdown();
    }
}
