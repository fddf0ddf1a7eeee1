//! Round-trip coverage for the wire codec: every v2 body type survives
//! `decode(encode(m)) == m`, and hostile extension chains are rejected.

use std::borrow::Cow;

use slp_codec::{Decode, Encode};
use slp_types::{
    core::LanguageTag,
    error::ErrorCode,
    message::{
        AttrRply, AttrRqst, AuthBlock, Body, DaAdvert, Extension, Flags, Header, Message,
        NamingAuthority, SaAdvert, SrvAck, SrvDeReg, SrvReg, SrvRply, SrvRqst, SrvTypeRply,
        SrvTypeRqst, UrlEntry,
    },
};

fn header(xid: u16) -> Header<'static> {
    Header::v2(xid, LanguageTag::try_from("en").unwrap())
}

fn auth_block() -> AuthBlock<'static> {
    AuthBlock {
        bsd: 0x0002,
        timestamp: 0x5bd1_0000,
        spi: Cow::Borrowed("spi-one"),
        data: Cow::Borrowed(&[0xca, 0xfe, 0xba, 0xbe]),
    }
}

fn url_entry() -> UrlEntry<'static> {
    UrlEntry {
        reserved: 0,
        lifetime: 3600,
        url: Cow::Borrowed("service:printer:lpr://printer.example.com:515/queue"),
        auths: vec![auth_block()],
    }
}

fn assert_round_trip(message: Message<'_>) {
    let encoded = message.to_vec().unwrap();
    let decoded = Message::decode(&encoded).unwrap();

    assert_eq!(decoded, message);

    // The declared length always covers the full PDU.
    let declared =
        usize::from(encoded[2]) << 16 | usize::from(encoded[3]) << 8 | usize::from(encoded[4]);
    assert_eq!(declared, encoded.len());

    // Re-encoding the decoded message reproduces the exact bytes.
    assert_eq!(decoded.to_vec().unwrap(), encoded);
}

#[test]
fn test_srv_rqst_round_trip() {
    assert_round_trip(Message::new(
        header(0x1001),
        Body::SrvRqst(SrvRqst {
            prlist: Cow::Borrowed("192.0.2.1,192.0.2.7"),
            service_type: Cow::Borrowed("service:printer:lpr"),
            scope_list: Cow::Borrowed("default,lab"),
            predicate: Cow::Borrowed("(&(color=*)(dpi>=300))"),
            spi: Cow::Borrowed(""),
        }),
    ));
}

#[test]
fn test_srv_rply_round_trip() {
    assert_round_trip(Message::new(
        header(0x1002),
        Body::SrvRply(SrvRply {
            error_code: ErrorCode::Ok,
            url_entries: vec![url_entry(), UrlEntry::new(0, "service:x://h/")],
        }),
    ));
}

#[test]
fn test_srv_reg_round_trip() {
    assert_round_trip(Message::new(
        {
            let mut header = header(0x1003);
            header.flags = Flags::default().with(Flags::FRESH);
            header
        },
        Body::SrvReg(SrvReg {
            url_entry: url_entry(),
            service_type: Cow::Borrowed("service:printer:lpr"),
            scope_list: Cow::Borrowed("default"),
            attr_list: Cow::Borrowed("(color=red,green),(dpi=300),keyw"),
            attr_auths: vec![auth_block()],
        }),
    ));
}

#[test]
fn test_srv_dereg_round_trip() {
    assert_round_trip(Message::new(
        header(0x1004),
        Body::SrvDeReg(SrvDeReg {
            scope_list: Cow::Borrowed("default"),
            url_entry: url_entry(),
            tag_list: Cow::Borrowed("color,dpi"),
        }),
    ));
}

#[test]
fn test_srv_ack_round_trip() {
    for error_code in [
        ErrorCode::Ok,
        ErrorCode::ScopeNotSupported,
        ErrorCode::Other(13),
    ] {
        assert_round_trip(Message::new(
            header(0x1005),
            Body::SrvAck(SrvAck { error_code }),
        ));
    }
}

#[test]
fn test_attr_rqst_round_trip() {
    assert_round_trip(Message::new(
        header(0x1006),
        Body::AttrRqst(AttrRqst {
            prlist: Cow::Borrowed(""),
            url: Cow::Borrowed("service:printer:lpr://printer.example.com:515/queue"),
            scope_list: Cow::Borrowed("default"),
            tag_list: Cow::Borrowed("color,dpi,page*"),
            spi: Cow::Borrowed("spi-one"),
        }),
    ));
}

#[test]
fn test_attr_rply_round_trip() {
    assert_round_trip(Message::new(
        header(0x1007),
        Body::AttrRply(AttrRply {
            error_code: ErrorCode::Ok,
            attr_list: Cow::Borrowed("(color=red),(dpi=300)"),
            attr_auths: vec![auth_block()],
        }),
    ));
}

#[test]
fn test_da_advert_round_trip() {
    assert_round_trip(Message::new(
        header(0x1008),
        Body::DaAdvert(DaAdvert {
            error_code: ErrorCode::Ok,
            boot_timestamp: 0x5bd1_2345,
            url: Cow::Borrowed("service:directory-agent://da.example.com"),
            scope_list: Cow::Borrowed("default,lab"),
            attr_list: Cow::Borrowed("(min-refresh-interval=600)"),
            spi_list: Cow::Borrowed("spi-one,spi-two"),
            auths: vec![auth_block()],
        }),
    ));
}

#[test]
fn test_srv_type_rqst_round_trip() {
    for naming_auth in [
        NamingAuthority::Iana,
        NamingAuthority::All,
        NamingAuthority::Other(Cow::Borrowed("acme")),
    ] {
        assert_round_trip(Message::new(
            header(0x1009),
            Body::SrvTypeRqst(SrvTypeRqst {
                prlist: Cow::Borrowed(""),
                naming_auth,
                scope_list: Cow::Borrowed("default"),
            }),
        ));
    }
}

#[test]
fn test_srv_type_rply_round_trip() {
    assert_round_trip(Message::new(
        header(0x100a),
        Body::SrvTypeRply(SrvTypeRply {
            error_code: ErrorCode::Ok,
            srvtype_list: Cow::Borrowed("service:printer:lpr,service:printer:ipp"),
        }),
    ));
}

#[test]
fn test_sa_advert_round_trip() {
    assert_round_trip(Message::new(
        header(0x100b),
        Body::SaAdvert(SaAdvert {
            url: Cow::Borrowed("service:service-agent://sa.example.com"),
            scope_list: Cow::Borrowed("default"),
            attr_list: Cow::Borrowed(""),
            auths: Vec::new(),
        }),
    ));
}

#[test]
fn test_extensions_round_trip() {
    let mut message = Message::new(
        header(0x100c),
        Body::SrvAck(SrvAck {
            error_code: ErrorCode::Ok,
        }),
    );
    message.extensions = vec![
        Extension {
            id: 0x4001,
            data: Cow::Borrowed(&[1, 2, 3]),
        },
        Extension {
            id: 0x0002,
            data: Cow::Borrowed(&[]),
        },
    ];

    assert_round_trip(message);
}

fn srv_ack_with_extension() -> Vec<u8> {
    let mut message = Message::new(
        header(0x100d),
        Body::SrvAck(SrvAck {
            error_code: ErrorCode::Ok,
        }),
    );
    message.extensions = vec![Extension {
        id: 1,
        data: Cow::Borrowed(&[9, 9]),
    }];

    message.to_vec().unwrap()
}

#[test]
fn test_extension_cycle_is_rejected() {
    let mut pdu = srv_ack_with_extension();

    // The single node lives at offset 18; point its next-offset back at
    // itself to form a cycle.
    let ext_offset = 18;
    assert_eq!(&pdu[7..10], &[0, 0, ext_offset as u8]);
    pdu[ext_offset + 2] = 0;
    pdu[ext_offset + 3] = 0;
    pdu[ext_offset + 4] = ext_offset as u8;

    assert!(Message::decode(&pdu).is_err());
}

#[test]
fn test_extension_offset_before_body_is_rejected() {
    let mut pdu = srv_ack_with_extension();
    pdu[9] = 4;

    assert!(Message::decode(&pdu).is_err());
}

#[test]
fn test_overlong_extension_chain_is_rejected() {
    let mut message = Message::new(
        header(0x100e),
        Body::SrvAck(SrvAck {
            error_code: ErrorCode::Ok,
        }),
    );
    message.extensions = (0..17)
        .map(|id| Extension {
            id,
            data: Cow::Borrowed(&[]),
        })
        .collect();

    let pdu = message.to_vec().unwrap();
    assert!(Message::decode(&pdu).is_err());

    message.extensions.truncate(16);
    let pdu = message.to_vec().unwrap();
    assert!(Message::decode(&pdu).is_ok());
}
