use flate2::{Decompress, FlushDecompress};

/// Every gateway message ends with a zlib sync flush.
const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xff, 0xff];
const OUTPUT_CHUNK_SIZE: usize = 16 * 1024;

/// Streaming decompressor for a zlib-stream gateway connection.
///
/// The gateway compresses the whole connection as one continuous zlib
/// stream, so the decompressor and its dictionary must live exactly as
/// long as the socket. A message may span several WebSocket frames;
/// fragments are buffered until the sync flush marker arrives.
#[derive(Debug)]
pub struct Inflater {
    decompress: Decompress,
    compressed: Vec<u8>,
}

impl Inflater {
    pub fn new() -> Self {
        Self {
            decompress: Decompress::new(true),
            compressed: Vec::new(),
        }
    }

    /// Buffer a compressed fragment received from the socket.
    pub fn extend(&mut self, slice: &[u8]) {
        self.compressed.extend_from_slice(slice);
    }

    /// Inflate the buffered fragments into the next complete message.
    ///
    /// Returns `None` while the buffered data does not yet end with the
    /// sync flush marker.
    pub fn message(&mut self) -> Result<Option<Vec<u8>>, std::io::Error> {
        let length = self.compressed.len();

        if length < 4 || self.compressed[length - 4..] != ZLIB_SUFFIX {
            return Ok(None);
        }

        let before = self.decompress.total_in();
        let mut offset = 0;
        let mut message = Vec::new();

        loop {
            let mut chunk = Vec::with_capacity(OUTPUT_CHUNK_SIZE);

            self.decompress
                .decompress_vec(&self.compressed[offset..], &mut chunk, FlushDecompress::Sync)
                .map_err(std::io::Error::from)?;

            offset = usize::try_from(self.decompress.total_in() - before).unwrap_or_default();
            message.extend_from_slice(&chunk);

            // Spare output capacity means the inflater ran out of input.
            if chunk.len() < chunk.capacity() || offset >= self.compressed.len() {
                break;
            }
        }

        self.compressed.clear();

        Ok(Some(message))
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Inflater;
    use flate2::{Compress, Compression, FlushCompress};

    /// Compress one message with a sync flush, sharing `compress` so the
    /// dictionary carries across messages like the gateway's stream does.
    fn deflate(compress: &mut Compress, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() + 64);
        let before = compress.total_in();

        loop {
            let consumed = (compress.total_in() - before) as usize;
            compress
                .compress_vec(&data[consumed..], &mut out, FlushCompress::Sync)
                .unwrap();

            let consumed = (compress.total_in() - before) as usize;
            if consumed == data.len() && out.len() < out.capacity() {
                break;
            }

            out.reserve(64.max(out.capacity()));
        }

        out
    }

    #[test]
    fn partial_fragment_yields_nothing() {
        let mut compress = Compress::new(Compression::default(), true);
        let frame = deflate(&mut compress, br#"{"op":11,"d":null,"s":null,"t":null}"#);

        let mut inflater = Inflater::new();
        inflater.extend(&frame[..frame.len() / 2]);
        assert_eq!(inflater.message().unwrap(), None);

        inflater.extend(&frame[frame.len() / 2..]);
        assert_eq!(
            inflater.message().unwrap().as_deref(),
            Some(br#"{"op":11,"d":null,"s":null,"t":null}"#.as_slice())
        );
    }

    #[test]
    fn dictionary_survives_across_messages() {
        let mut compress = Compress::new(Compression::default(), true);
        let first = br#"{"op":0,"d":{"content":"hello hello"},"s":1,"t":"MESSAGE_CREATE"}"#;
        let second = br#"{"op":0,"d":{"content":"hello again"},"s":2,"t":"MESSAGE_CREATE"}"#;
        let frame_one = deflate(&mut compress, first);
        let frame_two = deflate(&mut compress, second);

        let mut inflater = Inflater::new();
        inflater.extend(&frame_one);
        assert_eq!(inflater.message().unwrap().as_deref(), Some(first.as_slice()));
        inflater.extend(&frame_two);
        assert_eq!(inflater.message().unwrap().as_deref(), Some(second.as_slice()));
    }

    #[test]
    fn large_message_spills_over_one_output_chunk() {
        let mut compress = Compress::new(Compression::default(), true);
        let body = "x".repeat(64 * 1024);
        let message = format!(r#"{{"op":0,"d":{{"content":"{body}"}},"s":1,"t":"MESSAGE_CREATE"}}"#);
        let frame = deflate(&mut compress, message.as_bytes());

        let mut inflater = Inflater::new();
        inflater.extend(&frame);
        assert_eq!(
            inflater.message().unwrap(),
            Some(message.into_bytes())
        );
    }
}
