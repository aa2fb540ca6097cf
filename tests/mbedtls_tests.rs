//! mbedTLS proxy tests: request layout, response decoding and argument checks

mod common;

use altcom::api::mbedtls::{
    cipher::{CIPHER_INPUT_LEN, CIPHER_OUTPUT_LEN},
    config::{authmode, MAX_CIPHERSUITES},
    pk::PEM_BUF_LEN,
    ssl::{lookup_version, DTLS_V1_2, TLS_UNKNOWN, TLS_V1_2, VERSION_LEN},
    CipherUpdate, ContextKind,
};
use altcom::core::memory;
use altcom::core::protocol::{CommandId, PayloadReader, ProtocolError};
use altcom::error::errno;
use altcom::{Altcom, Error};
use common::{sent_cmd, sent_payload, Frame, ModemLink};
use embassy_futures::{block_on, join::join};

/// Response payload: `ret_code` followed by `body`
fn ret_payload(ret: i32, body: &[u8]) -> std::vec::Vec<u8> {
    let mut payload = ret.to_be_bytes().to_vec();
    payload.extend_from_slice(body);
    payload
}

/// Run `call` while answering its single request with `payload`; returns the
/// call's result and the request frame
fn exchange<'l, F, R>(altcom: &Altcom<common::MockTx<'l>>, link: &'l ModemLink, payload: &[u8], call: F) -> (R, Frame)
where
    F: core::future::Future<Output = R>,
{
    common::run_session(altcom, link, async {
        let (result, frame) = join(call, async {
            let frame = link.next_sent().await;
            link.respond(sent_cmd(&frame), payload);
            frame
        })
        .await;
        (result, frame)
    })
}

fn words(payload: &[u8]) -> std::vec::Vec<u32> {
    let mut reader = PayloadReader::new(payload);
    let mut out = std::vec::Vec::new();
    while reader.remaining() >= 4 {
        out.push(reader.read_u32().unwrap());
    }
    out
}

#[test]
fn test_context_ids_per_kind() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = common::session(&link);

    assert_eq!(altcom.ssl_init().id, 0);
    assert_eq!(altcom.ssl_init().id, 1);
    assert_eq!(altcom.ssl_config_init().id, 0);
    assert_eq!(altcom.cipher_init().id, 0);
    assert_eq!(altcom.context_ids().allocate(ContextKind::Ssl), 2);

    // A second session numbers its own contexts
    let other = common::session(&link);
    assert_eq!(other.ssl_init().id, 0);
}

#[test]
fn test_ssl_setup() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = common::session(&link);
    let ssl = altcom.ssl_init();
    let _ = altcom.ssl_init();
    let ssl2 = altcom.ssl_init();
    let conf = altcom.ssl_config_init();
    assert_eq!(ssl.id, 0);

    let (result, frame) = exchange(&altcom, &link, &ret_payload(-0x7100, &[]), altcom.ssl_setup(&ssl2, &conf));
    assert_eq!(result, Ok(-0x7100));
    assert_eq!(sent_cmd(&frame), CommandId::TLS_SSL_SETUP);
    assert_eq!(words(sent_payload(&frame)), [2, 0]);
    drop(altcom);
    assert_eq!(memory::stats().allocated, 0);
}

#[test]
fn test_ssl_get_version() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = common::session(&link);
    let ssl = altcom.ssl_init();

    let mut field = [0u8; VERSION_LEN];
    field[..TLS_V1_2.len()].copy_from_slice(TLS_V1_2.as_bytes());
    let (result, frame) = exchange(&altcom, &link, &ret_payload(0, &field), altcom.ssl_get_version(&ssl));
    assert_eq!(result, Ok(TLS_V1_2));
    assert_eq!(sent_cmd(&frame), CommandId::TLS_SSL_VERSION);
    assert_eq!(sent_payload(&frame), &0u32.to_be_bytes());
}

#[test]
fn test_lookup_version() {
    let mut field = [0u8; VERSION_LEN];
    field[..DTLS_V1_2.len()].copy_from_slice(DTLS_V1_2.as_bytes());
    assert_eq!(lookup_version(&field), DTLS_V1_2);

    assert_eq!(lookup_version(b"TLSv9.9\0\0\0\0\0\0\0\0\0"), TLS_UNKNOWN);
    assert_eq!(lookup_version(&[0u8; VERSION_LEN]), TLS_UNKNOWN);

    // Without a terminator the last byte is cut off
    let mut full = [b'x'; VERSION_LEN];
    full[..7].copy_from_slice(b"TLSv1.2");
    assert_eq!(lookup_version(&full), TLS_UNKNOWN);
    assert_eq!(lookup_version(b"TLSv1.2X"), TLS_V1_2);
}

#[test]
fn test_ssl_get_srtp_profile() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = common::session(&link);
    let ssl = altcom.ssl_init();

    let (result, frame) = exchange(
        &altcom,
        &link,
        &ret_payload(0, &2i32.to_be_bytes()),
        altcom.ssl_get_srtp_profile(&ssl),
    );
    assert_eq!(result, Ok(2));
    assert_eq!(sent_cmd(&frame), CommandId::TLS_SSL_SRTP_PROFILE);
}

#[test]
fn test_ssl_conf_authmode() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = common::session(&link);
    let conf = altcom.ssl_config_init();

    let (result, frame) = exchange(
        &altcom,
        &link,
        &ret_payload(0, &[]),
        altcom.ssl_conf_authmode(&conf, authmode::VERIFY_REQUIRED),
    );
    assert_eq!(result, Ok(0));
    assert_eq!(sent_cmd(&frame), CommandId::TLS_CONFIG_AUTHMODE);
    assert_eq!(words(sent_payload(&frame)), [0, 2]);
}

#[test]
fn test_ssl_conf_ciphersuites() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = common::session(&link);
    let conf = altcom.ssl_config_init();

    // Entries after the first zero are not sent
    let suites = [0xC02B, 0xC02F, 0, 0x1301];
    let (result, frame) = exchange(&altcom, &link, &ret_payload(0, &[]), altcom.ssl_conf_ciphersuites(&conf, &suites));
    assert_eq!(result, Ok(0));
    assert_eq!(sent_cmd(&frame), CommandId::TLS_CONFIG_CIPHERSUITES);

    let sent = words(sent_payload(&frame));
    assert_eq!(sent.len(), 1 + MAX_CIPHERSUITES);
    assert_eq!(&sent[..3], &[0, 0xC02B, 0xC02F]);
    assert!(sent[3..].iter().all(|&suite| suite == 0));
}

#[test]
fn test_too_many_ciphersuites_rejected() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = common::session(&link);
    let conf = altcom.ssl_config_init();

    let suites = [0x1301; MAX_CIPHERSUITES + 1];
    let err = block_on(altcom.ssl_conf_ciphersuites(&conf, &suites)).unwrap_err();
    assert_eq!(err, Error::InvalidArgument);
    assert_eq!(err.errno(), -errno::EINVAL);
    assert_eq!(link.send_count(), 0);
    assert_eq!(memory::stats().allocated, 0);
}

#[test]
fn test_pk_init_allocates_id() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = common::session(&link);

    let (first, frame) = exchange(&altcom, &link, &ret_payload(0, &[]), altcom.pk_init());
    assert_eq!(first.unwrap().id, 0);
    assert_eq!(sent_cmd(&frame), CommandId::TLS_PK_INIT);
    assert_eq!(sent_payload(&frame), &0u32.to_be_bytes());

    altcom.initialize();
    let (second, frame) = exchange(&altcom, &link, &ret_payload(0, &[]), altcom.pk_init());
    assert_eq!(second.unwrap().id, 1);
    assert_eq!(sent_payload(&frame), &1u32.to_be_bytes());
}

#[test]
fn test_pk_write_key_pem() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = common::session(&link);
    let ctx = altcom.context_ids().allocate(ContextKind::Pk);
    let ctx = altcom::api::mbedtls::PkContext { id: ctx };

    let mut pem = [0u8; PEM_BUF_LEN];
    pem[..5].copy_from_slice(b"-----");

    let mut buf = [0xAAu8; 16];
    let (result, frame) = exchange(&altcom, &link, &ret_payload(0, &pem), altcom.pk_write_key_pem(&ctx, &mut buf));
    assert_eq!(result, Ok(0));
    assert_eq!(sent_cmd(&frame), CommandId::TLS_PK_WRITE_KEY_PEM);
    assert_eq!(words(sent_payload(&frame)), [0, 16]);
    assert_eq!(&buf[..5], b"-----");
    assert!(buf[5..].iter().all(|&b| b == 0));

    // A failed export leaves the caller's buffer alone
    altcom.initialize();
    let mut untouched = [0xAAu8; 16];
    let (result, _) = exchange(
        &altcom,
        &link,
        &ret_payload(-0x3D00, &pem),
        altcom.pk_write_key_pem(&ctx, &mut untouched),
    );
    assert_eq!(result, Ok(-0x3D00));
    assert!(untouched.iter().all(|&b| b == 0xAA));
}

fn cipher_response(ret: i32, produced: &[u8], olen: u32) -> std::vec::Vec<u8> {
    let mut output = [0u8; CIPHER_OUTPUT_LEN];
    output[..produced.len()].copy_from_slice(produced);
    let mut payload = ret_payload(ret, &output);
    payload.extend_from_slice(&olen.to_be_bytes());
    payload
}

#[test]
fn test_cipher_update() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = common::session(&link);
    let ctx = altcom.cipher_init();

    let input = [0x11u8; 20];
    let mut output = [0u8; 32];
    let (result, frame) = exchange(
        &altcom,
        &link,
        &cipher_response(0, &[0x22; 32], 32),
        altcom.cipher_update(&ctx, &input, &mut output),
    );
    assert_eq!(result, Ok(CipherUpdate { ret_code: 0, olen: 32 }));
    assert_eq!(output, [0x22; 32]);

    let payload = sent_payload(&frame);
    assert_eq!(sent_cmd(&frame), CommandId::TLS_CIPHER_UPDATE);
    assert_eq!(payload.len(), 4 + CIPHER_INPUT_LEN + 4);
    assert_eq!(&payload[4..24], &input);
    assert!(payload[24..4 + CIPHER_INPUT_LEN].iter().all(|&b| b == 0));
    assert_eq!(&payload[4 + CIPHER_INPUT_LEN..], &20u32.to_be_bytes());
}

#[test]
fn test_cipher_update_truncates_to_output() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = common::session(&link);
    let ctx = altcom.cipher_init();

    let mut output = [0u8; 8];
    let (result, _) = exchange(
        &altcom,
        &link,
        &cipher_response(0, &[0x33; 16], 16),
        altcom.cipher_update(&ctx, &[1, 2, 3], &mut output),
    );
    assert_eq!(result, Ok(CipherUpdate { ret_code: 0, olen: 8 }));
    assert_eq!(output, [0x33; 8]);
}

#[test]
fn test_cipher_update_rejects_bad_lengths() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = common::session(&link);
    let ctx = altcom.cipher_init();
    let mut output = [0u8; CIPHER_OUTPUT_LEN];

    let err = block_on(altcom.cipher_update(&ctx, &[0; CIPHER_INPUT_LEN + 1], &mut output)).unwrap_err();
    assert_eq!(err, Error::InvalidArgument);
    assert_eq!(link.send_count(), 0);

    // The modem claims more output than the field holds
    let (result, _) = exchange(
        &altcom,
        &link,
        &cipher_response(0, &[], CIPHER_OUTPUT_LEN as u32 + 1),
        altcom.cipher_update(&ctx, &[0; 4], &mut output),
    );
    assert_eq!(result, Err(Error::Protocol(ProtocolError::InvalidLength)));
}

#[test]
fn test_calls_need_initialized_session() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = Altcom::new(link.tx(), common::test_config());
    let ssl = altcom.ssl_init();
    let conf = altcom.ssl_config_init();

    block_on(async {
        let err = altcom.ssl_setup(&ssl, &conf).await.unwrap_err();
        assert_eq!(err, Error::NotInitialized);
        assert_eq!(err.errno(), -errno::ENETDOWN);
        assert_eq!(altcom.ssl_get_version(&ssl).await, Err(Error::NotInitialized));
        assert_eq!(altcom.pk_init().await, Err(Error::NotInitialized));
        assert_eq!(altcom.ssl_conf_authmode(&conf, 0).await, Err(Error::NotInitialized));
    });

    // TLS calls do not need the modem powered on
    altcom.initialize();
    let (result, _) = exchange(&altcom, &link, &ret_payload(0, &[]), altcom.ssl_setup(&ssl, &conf));
    assert_eq!(result, Ok(0));
}

#[test]
fn test_short_response_rejected() {
    let _serial = common::serial();
    let link = ModemLink::new();
    let altcom = common::session(&link);
    let ssl = altcom.ssl_init();

    // Version response without its string field
    let (result, _) = exchange(&altcom, &link, &ret_payload(0, &[]), altcom.ssl_get_version(&ssl));
    assert_eq!(result, Err(Error::Protocol(ProtocolError::InvalidLength)));
    drop(altcom);
    assert_eq!(memory::stats().allocated, 0);
}
