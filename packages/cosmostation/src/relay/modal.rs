/// Shows the pairing URI to the user, typically as a QR code.
pub trait QrModal: Send + Sync {
    /// Display the URI for the given chains.
    fn open(&self, uri: &str, chain_ids: &[String]);

    /// Hide the modal. Called on every exit from the bootstrap, success or not.
    fn close(&self);
}

/// A modal that only logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopModal;

impl QrModal for NoopModal {
    fn open(&self, uri: &str, chain_ids: &[String]) {
        tracing::debug!("Pairing URI for {chain_ids:?}: {uri}");
    }

    fn close(&self) {}
}

impl<T: QrModal> QrModal for &T {
    fn open(&self, uri: &str, chain_ids: &[String]) {
        (*self).open(uri, chain_ids)
    }

    fn close(&self) {
        (*self).close()
    }
}
