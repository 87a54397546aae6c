use proptest::prelude::*;

use crate::protocol::control::ControlMessage;

proptest! {
    #[test]
    fn test_decode_any_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
        // Should not panic
        let _ = ControlMessage::decode(&bytes);
    }

    #[test]
    fn test_play_at_roundtrip(instant in any::<i64>()) {
        let msg = ControlMessage::play_at(instant);
        prop_assert_eq!(ControlMessage::decode(&msg.encode()), Some(msg));
    }

    #[test]
    fn test_ready_roundtrip(name in "[A-Za-z0-9][A-Za-z0-9 _|-]{0,30}[A-Za-z0-9]") {
        let msg = ControlMessage::ready(name);
        prop_assert_eq!(ControlMessage::decode(&msg.encode()), Some(msg));
    }
}
