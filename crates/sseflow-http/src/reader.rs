use futures::StreamExt;

use sseflow_core::error::SourceError;
use sseflow_core::transport::StreamReader;

use crate::decoder::Utf8Decoder;

/// Turn a reqwest response body into a text [`StreamReader`].
///
/// Bytes are decoded incrementally; a body error ends the stream after
/// being surfaced once.
pub fn body_reader(response: reqwest::Response) -> StreamReader {
    StreamReader::new(async_stream::stream! {
        let mut decoder = Utf8Decoder::new();
        let mut byte_stream = Box::pin(response.bytes_stream());
        let mut failed = false;

        while let Some(result) = byte_stream.next().await {
            match result {
                Ok(bytes) => {
                    let text = decoder.decode(&bytes);
                    if !text.is_empty() {
                        yield Ok(text);
                    }
                }
                Err(e) => {
                    yield Err(SourceError::Stream(e.to_string()));
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            if let Some(rest) = decoder.finish() {
                yield Ok(rest);
            }
        }
    })
}
