use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use bytes::Bytes;
use sml_amf0::{deserialize as amf0_deserialize, serialize as amf0_serialize, Amf0Value};
use std::io::Cursor;

pub fn serialize(
    command_name: String,
    transaction_id: f64,
    command_object: Amf0Value,
    additional_arguments: Vec<Amf0Value>,
) -> Result<Bytes, MessageSerializationError> {
    let mut values = vec![
        Amf0Value::Utf8String(command_name),
        Amf0Value::Number(transaction_id),
        command_object,
    ];

    for argument in additional_arguments {
        values.push(argument);
    }

    let bytes = amf0_serialize(&values)?;
    Ok(Bytes::from(bytes))
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let mut values = amf0_deserialize(&mut cursor)?.into_iter();

    let command_name = match values.next() {
        Some(Amf0Value::Utf8String(name)) => name,
        _ => return Err(MessageDeserializationError::InvalidMessageFormat),
    };

    let transaction_id = match values.next() {
        Some(Amf0Value::Number(id)) => id,
        _ => return Err(MessageDeserializationError::InvalidMessageFormat),
    };

    let command_object = match values.next() {
        Some(value) => value,
        None => return Err(MessageDeserializationError::InvalidMessageFormat),
    };

    Ok(RtmpMessage::Amf0Command {
        command_name,
        transaction_id,
        command_object,
        additional_arguments: values.collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sml_amf0::Amf0Object;

    #[test]
    fn round_trips_connect_style_command() {
        let mut command_object = Amf0Object::new();
        command_object.set("app", Amf0Value::Utf8String("live".to_string()));

        let bytes = serialize(
            "connect".to_string(),
            1.0,
            Amf0Value::Object(command_object.clone()),
            vec![],
        )
        .unwrap();

        let message = deserialize(&bytes[..]).unwrap();
        assert_eq!(
            message,
            RtmpMessage::Amf0Command {
                command_name: "connect".to_string(),
                transaction_id: 1.0,
                command_object: Amf0Value::Object(command_object),
                additional_arguments: vec![],
            }
        );
    }

    #[test]
    fn additional_arguments_are_kept_in_order() {
        let bytes = serialize(
            "play".to_string(),
            0.0,
            Amf0Value::Null,
            vec![
                Amf0Value::Utf8String("stream".to_string()),
                Amf0Value::Number(-2.0),
            ],
        )
        .unwrap();

        match deserialize(&bytes[..]).unwrap() {
            RtmpMessage::Amf0Command {
                additional_arguments,
                ..
            } => {
                assert_eq!(
                    additional_arguments,
                    vec![
                        Amf0Value::Utf8String("stream".to_string()),
                        Amf0Value::Number(-2.0),
                    ]
                );
            }
            x => panic!("Expected Amf0Command, got {:?}", x),
        }
    }

    #[test]
    fn error_when_command_name_is_missing() {
        let bytes = amf0_serialize(&[Amf0Value::Number(1.0)]).unwrap();
        match deserialize(&bytes[..]) {
            Err(MessageDeserializationError::InvalidMessageFormat) => (),
            x => panic!("Expected InvalidMessageFormat, got {:?}", x.map(|_| ())),
        }
    }
}
