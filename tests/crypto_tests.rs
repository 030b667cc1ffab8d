//! Message crypto interoperability tests
//!
//! Ciphertexts below were produced by an independent AES-256-CBC
//! implementation with the fixed random prefix `0123456789abcdef`.

use wechat_component::crypto::{signature, MessageCrypto, PrpCrypto};
use wechat_component::message::{ComponentInfo, ComponentMessage};
use wechat_component::types::{AppId, EncodingAesKey, Token};
use wechat_component::WechatError;

const APPID: &str = "wx1234567890abcdef";
const ENCODING_AES_KEY: &str = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG";

const HELLO_CIPHERTEXT: &str =
    "Q3stYC6hdFzMh9T8HCvyDLmrleeHrGUuS1gjThU5PD81b/etuVOdPCr6b9Vsf0AfALgy+3OzxnbVTWyi9F8Bjg==";

const TICKET_CIPHERTEXT: &str = "Q3stYC6hdFzMh9T8HCvyDNUNZlVL9NHHP4UVOEOKBG6iztYi/6WJHL+J7T9FsUtlLys67Cgp0uCfm3gwVYgXeGD2gJbW/RXEuMYWj2L1SL4fW0gENrNp6AmkWO6ZPTaT9VNuRZ0dIsKy9GreXG3S3zy6eAetlOBj5PyYKtk45UvBUrQ15N6s+Km3ZRBqRSz+ySXIzeYX31XndQG0L1Cg5y/1Ynw+BFNmyT1pIP5k6YhtJaMTQ6K0uk7IH7HdhVpqmrH9sAbBoI5eiBcNsxdJPcsZkb1I5makbyJ4HTn3d4mNwU5cM/PahNh4gxk/Q6ySZudiBUzTsCP53N2VPX/VAn/7RdfdPFasWeyLN913OavvDG/penZAlBrPjM55g5jL";
const TICKET_SIGNATURE: &str = "da0bfc43589a51b0990595fd632bf280040b97c9";

fn prp() -> PrpCrypto {
    PrpCrypto::from_encoding_aes_key(&EncodingAesKey::new(ENCODING_AES_KEY).unwrap()).unwrap()
}

fn crypto() -> MessageCrypto {
    MessageCrypto::new(
        Token::new("component_token").unwrap(),
        &EncodingAesKey::new(ENCODING_AES_KEY).unwrap(),
        AppId::new(APPID).unwrap(),
    )
    .unwrap()
}

#[test]
fn test_decrypt_independent_ciphertext() {
    assert_eq!(prp().decrypt(HELLO_CIPHERTEXT, APPID).unwrap(), "hello world");
}

#[test]
fn test_decrypt_rejects_other_appid() {
    let result = prp().decrypt(HELLO_CIPHERTEXT, "wxffffffffffffffff");
    assert!(matches!(result, Err(WechatError::Crypto(_))));
}

#[test]
fn test_encrypt_is_randomized_but_decryptable() {
    let prp = prp();
    let a = prp.encrypt("hello world", APPID).unwrap();
    let b = prp.encrypt("hello world", APPID).unwrap();
    assert_ne!(a, b);
    assert_eq!(prp.decrypt(&a, APPID).unwrap(), "hello world");
    assert_eq!(prp.decrypt(&b, APPID).unwrap(), "hello world");
}

#[test]
fn test_signature_known_value() {
    assert_eq!(
        signature("component_token", "1409304348", "xxxxxx", "encrypted"),
        "4743fb4ec9770e9a9ea19d133efd5b50f1b7cd67"
    );
}

#[test]
fn test_decrypt_message_verify_ticket() {
    let xml = format!(
        "<xml><AppId><![CDATA[{}]]></AppId><Encrypt><![CDATA[{}]]></Encrypt></xml>",
        APPID, TICKET_CIPHERTEXT
    );
    let plain = crypto()
        .decrypt_message(&xml, TICKET_SIGNATURE, "1409304348", "xxxxxx")
        .unwrap();

    let message = ComponentMessage::parse(&plain).unwrap();
    assert_eq!(message.appid, APPID);
    assert_eq!(message.create_time, 1413192605);
    assert_eq!(
        message.info,
        ComponentInfo::VerifyTicket {
            verify_ticket: "ticket@@@fixed".to_string()
        }
    );
}

#[test]
fn test_decrypt_message_bad_signature() {
    let xml = format!(
        "<xml><AppId><![CDATA[{}]]></AppId><Encrypt><![CDATA[{}]]></Encrypt></xml>",
        APPID, TICKET_CIPHERTEXT
    );
    let result = crypto().decrypt_message(&xml, TICKET_SIGNATURE, "1409304349", "xxxxxx");
    assert!(matches!(result, Err(WechatError::Signature(_))));
}

#[test]
fn test_encrypt_message_envelope_is_signed() {
    let crypto = crypto();
    let envelope = crypto
        .encrypt_message("<xml><Content>hi</Content></xml>", Some("nonce1"), Some("1700000000"))
        .unwrap();

    assert!(envelope.contains("<TimeStamp>1700000000</TimeStamp>"));
    assert!(envelope.contains("<Nonce><![CDATA[nonce1]]></Nonce>"));

    let signature_start = envelope.find("<MsgSignature><![CDATA[").unwrap() + 23;
    let msg_signature = &envelope[signature_start..signature_start + 40];
    let decrypted = crypto
        .decrypt_message(&envelope, msg_signature, "1700000000", "nonce1")
        .unwrap();
    assert_eq!(decrypted, "<xml><Content>hi</Content></xml>");
}
