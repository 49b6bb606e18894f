use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use bytes::Bytes;

pub fn serialize(data: Bytes) -> Result<Bytes, MessageSerializationError> {
    Ok(data)
}

pub fn deserialize(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    Ok(RtmpMessage::AudioData { data })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_payload_is_opaque() {
        let data = Bytes::from(vec![0xaf_u8, 0x01, 0xde, 0xad]);

        assert_eq!(serialize(data.clone()).unwrap(), data);
        assert_eq!(
            deserialize(data.clone()).unwrap(),
            RtmpMessage::AudioData { data }
        );
    }
}
