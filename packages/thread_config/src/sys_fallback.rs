use crate::{Error, Result, ThreadOptions};

pub(crate) fn apply(_options: &ThreadOptions) -> Result<()> {
    Err(Error::Unsupported { operation: "apply" })
}

pub(crate) fn retrieve() -> Result<ThreadOptions> {
    Err(Error::Unsupported {
        operation: "retrieve",
    })
}

pub(crate) fn cancel() -> Result<()> {
    Err(Error::Unsupported {
        operation: "cancel",
    })
}
