fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use seedshare_protocol::{
        ControlFrame, FileDescriptor, IceServer, Recipient, RelayMessage, RelayMessageType,
    };
    use serde_json::Value;

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_fixture(name: &str) -> Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Parses a fixture into `T`, re-serializes it and compares the JSON
    /// values (key order independent). Returns the parsed value.
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  wire: {fixture}\n  Rust: {reserialized}"
        );
        parsed
    }

    // --- Relay messages ---

    #[test]
    fn fixture_relay_welcome() {
        let msg = roundtrip_test::<RelayMessage>("relay_welcome.json");
        assert_eq!(msg.msg_type, RelayMessageType::Welcome);
        assert_eq!(msg.welcome_id(), Some("5f0c6f1e-8d3a-4a53-9c53-0a3f1f1c2b7d"));
    }

    #[test]
    fn fixture_relay_join() {
        let msg = roundtrip_test::<RelayMessage>("relay_join.json");
        assert_eq!(msg.room(), Some("file-share-room"));
        assert_eq!(msg.role(), None);

        let msg = roundtrip_test::<RelayMessage>("relay_join_seeder.json");
        assert_eq!(msg.role(), Some("seeder"));
    }

    #[test]
    fn fixture_relay_offer_keeps_sdp_verbatim() {
        let msg = roundtrip_test::<RelayMessage>("relay_offer.json");
        assert_eq!(msg.target(), Recipient::Seeder);
        let sdp = msg.description().unwrap()["sdp"].as_str().unwrap();
        assert!(sdp.starts_with("v=0\r\n"));
    }

    #[test]
    fn fixture_relay_answer() {
        let msg = roundtrip_test::<RelayMessage>("relay_answer.json");
        assert_eq!(
            msg.target(),
            Recipient::Peer("5f0c6f1e-8d3a-4a53-9c53-0a3f1f1c2b7d")
        );
        assert_eq!(msg.description().unwrap()["type"], "answer");
    }

    #[test]
    fn fixture_relay_candidate() {
        let msg = roundtrip_test::<RelayMessage>("relay_candidate.json");
        let cand = msg.ice_candidate().unwrap();
        assert_eq!(cand.sdp_mid.as_deref(), Some("0"));
        assert_eq!(cand.sdp_m_line_index, Some(0));
        assert!(cand.candidate.contains("typ srflx"));
    }

    #[test]
    fn fixture_relay_error() {
        let msg = roundtrip_test::<RelayMessage>("relay_error.json");
        assert_eq!(msg.error_message(), Some("Failed to create answer"));
        assert_eq!(msg.target(), Recipient::Room);
    }

    #[test]
    fn relay_constructors_match_fixtures() {
        let built = serde_json::to_value(RelayMessage::welcome(
            "5f0c6f1e-8d3a-4a53-9c53-0a3f1f1c2b7d",
        ))
        .unwrap();
        assert_eq!(built, load_fixture("relay_welcome.json"));

        let built =
            serde_json::to_value(RelayMessage::join(Some("file-share-room"), Some("seeder")))
                .unwrap();
        assert_eq!(built, load_fixture("relay_join_seeder.json"));
    }

    // --- Transfer control frames ---

    #[test]
    fn fixture_control_frames() {
        assert_eq!(
            roundtrip_test::<ControlFrame>("control_request_list.json"),
            ControlFrame::RequestList
        );
        assert_eq!(
            roundtrip_test::<ControlFrame>("control_file_list.json"),
            ControlFrame::FileList {
                files: vec![
                    FileDescriptor::new("notes.txt", 1024),
                    FileDescriptor::new("report.zip", 32770),
                ],
            }
        );
        assert_eq!(
            roundtrip_test::<ControlFrame>("control_request_file.json"),
            ControlFrame::RequestFile {
                file_name: "report.zip".into()
            }
        );
        assert_eq!(
            roundtrip_test::<ControlFrame>("control_file_start.json"),
            ControlFrame::FileStart {
                name: "report.zip".into(),
                size: 32770
            }
        );
        assert_eq!(
            roundtrip_test::<ControlFrame>("control_file_end.json"),
            ControlFrame::FileEnd
        );
        assert_eq!(
            roundtrip_test::<ControlFrame>("control_error.json"),
            ControlFrame::Error {
                message: "File not found".into()
            }
        );
    }

    // --- NAT traversal config ---

    #[test]
    fn fixture_ice_servers() {
        let servers = roundtrip_test::<Vec<IceServer>>("ice_servers.json");
        assert_eq!(servers.len(), 2);
        assert!(servers[0].is_turn());
        assert!(servers[0].has_credentials());
        assert!(!servers[1].is_turn());
    }
}
