use crate::transport::Frame;

const MAX_TEXT_CHARS: usize = 200;
const MAX_BINARY_BYTES: usize = 16;

pub fn frame_to_string(frame: &Frame) -> String {
    match frame {
        Frame::Text(text) => {
            let mut chars = text.chars();
            let head: String = chars.by_ref().take(MAX_TEXT_CHARS).collect();
            match chars.next() {
                Some(_) => format!("TEXT   {}... ({} bytes)", head, text.len()),
                None => format!("TEXT   {}", head),
            }
        }
        Frame::Binary(data) => {
            let head = &data[..data.len().min(MAX_BINARY_BYTES)];
            let ellipsis = if data.len() > MAX_BINARY_BYTES { "..." } else { "" };
            format!("BINARY {}{} ({} bytes)", hex::encode(head), ellipsis, data.len())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_frame_to_string() {
        assert_eq!("TEXT   {}", frame_to_string(&Frame::Text("{}".into())));
        assert_eq!(
            "BINARY 0102ff (3 bytes)",
            frame_to_string(&Frame::Binary(Bytes::from(vec![1u8, 2, 255])))
        );
        let long = frame_to_string(&Frame::Binary(Bytes::from(vec![0u8; 20])));
        assert!(long.ends_with("... (20 bytes)"));
    }
}
