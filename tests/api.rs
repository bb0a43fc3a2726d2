// Full handshakes against a scripted peer on a loopback socket.  The
// peer drives the server side of the protocol out of the library's own
// primitives plus the generated test certificates, so both directions
// of every construction get exercised against each other.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use p256::ecdsa::signature::Signer;
use p256::pkcs8::DecodePrivateKey;

use tlsmith::internal::cipher::MessageCipher;
use tlsmith::internal::hash_hs::HandshakeHash;
use tlsmith::internal::key_schedule::{derive_next_secret, KeySchedule, SecretKind};
use tlsmith::internal::kx::KeyPairs;
use tlsmith::internal::msgs::codec::{read_u16, read_u24, read_u8, Reader};
use tlsmith::internal::msgs::enums::HashAlgorithm;
use tlsmith::internal::prf::SessionSecrets;
use tlsmith::internal::verify::{tls12_kx_verify_bytes, tls13_verify_bytes};
use tlsmith::suites::{self, SupportedCipherSuite};
use tlsmith::{
    fill_random, CipherSuite, ClientConfig, ClientSession, ContentType, NamedGroup,
    NegotiatedStats, ProtocolVersion, RootCertStore, SignatureScheme,
};

const ROOT: &[u8] = include_bytes!("testdata/root.der");
const INTER: &[u8] = include_bytes!("testdata/inter.der");
const LEAF: &[u8] = include_bytes!("testdata/leaf.der");
const LEAF_KEY: &[u8] = include_bytes!("testdata/leaf-key.der");

// 2026-08-02, inside the fixtures' validity window.
const NOW: u64 = 1785650400;

fn leaf_signer() -> p256::ecdsa::SigningKey {
    let secret = p256::SecretKey::from_pkcs8_der(LEAF_KEY).unwrap();
    p256::ecdsa::SigningKey::from(secret)
}

fn read_record(sock: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut header = [0u8; 5];
    sock.read_exact(&mut header).unwrap();
    let len = u16::from_be_bytes([header[3], header[4]]) as usize;
    let mut payload = vec![0u8; len];
    sock.read_exact(&mut payload).unwrap();
    (header[0], payload)
}

fn write_record(sock: &mut TcpStream, typ: u8, payload: &[u8]) {
    let mut rec = vec![typ, 0x03, 0x03];
    rec.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    rec.extend_from_slice(payload);
    sock.write_all(&rec).unwrap();
}

fn hs_msg(typ: u8, body: &[u8]) -> Vec<u8> {
    let mut msg = vec![typ, 0, 0, 0];
    msg[1..4].copy_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
    msg.extend_from_slice(body);
    msg
}

fn u24(n: usize) -> [u8; 3] {
    let be = (n as u32).to_be_bytes();
    [be[1], be[2], be[3]]
}

fn send_encrypted(
    cipher: &MessageCipher,
    seq: &mut u64,
    sock: &mut TcpStream,
    typ: ContentType,
    plain: &[u8],
) {
    let mut buf = vec![0u8; plain.len() + 512];
    let n = cipher.encrypt(&mut buf, *seq, typ, plain).unwrap();
    *seq += 1;
    sock.write_all(&buf[..n]).unwrap();
}

fn recv_encrypted(
    cipher: &MessageCipher,
    seq: &mut u64,
    sock: &mut TcpStream,
) -> (ContentType, Vec<u8>) {
    let (typ, mut payload) = read_record(sock);
    let outer = match typ {
        0x15 => ContentType::Alert,
        0x16 => ContentType::Handshake,
        0x17 => ContentType::ApplicationData,
        other => panic!("unexpected outer type {}", other),
    };
    let (inner, range) = cipher.decrypt(&mut payload, outer, *seq).unwrap();
    *seq += 1;
    (inner, payload[range].to_vec())
}

struct ClientHelloInfo {
    random: [u8; 32],
    x25519_share: Vec<u8>,
}

fn parse_client_hello(payload: &[u8]) -> ClientHelloInfo {
    let mut r = Reader::init(payload);
    assert_eq!(read_u8(&mut r), Some(0x01));
    let len = read_u24(&mut r).unwrap() as usize;
    let mut r = r.sub(len).unwrap();

    assert_eq!(read_u16(&mut r), Some(0x0303));
    let mut random = [0u8; 32];
    random.copy_from_slice(r.take(32).unwrap());
    r.take_vec_u8().unwrap(); // legacy session id
    r.take_vec_u16().unwrap(); // offered suites
    r.take_vec_u8().unwrap(); // compression methods

    let mut x25519_share = Vec::new();
    if r.any_left() {
        let elen = read_u16(&mut r).unwrap() as usize;
        let mut exts = r.sub(elen).unwrap();
        while exts.any_left() {
            let typ = read_u16(&mut exts).unwrap();
            let body = exts.take_vec_u16().unwrap();
            if typ == 0x0033 {
                let mut kr = Reader::init(body);
                let total = read_u16(&mut kr).unwrap() as usize;
                let mut list = kr.sub(total).unwrap();
                while list.any_left() {
                    let group = read_u16(&mut list).unwrap();
                    let key = list.take_vec_u16().unwrap();
                    if group == 0x001d {
                        x25519_share = key.to_vec();
                    }
                }
            }
        }
    }

    ClientHelloInfo {
        random,
        x25519_share,
    }
}

/// The 1.2 key block puts client keys first; the scripted peer writes
/// with the server halves, so hand it the block with the roles
/// swapped.
fn swapped_key_block(scs: &SupportedCipherSuite, kb: &[u8]) -> Vec<u8> {
    let m = scs.mac_key_len;
    let k = scs.enc_key_len;
    let mut out = Vec::with_capacity(kb.len());
    out.extend_from_slice(&kb[m..2 * m]);
    out.extend_from_slice(&kb[..m]);
    out.extend_from_slice(&kb[2 * m + k..2 * m + 2 * k]);
    out.extend_from_slice(&kb[2 * m..2 * m + k]);
    let iv_base = 2 * m + 2 * k;
    let iv = scs.fixed_iv_len;
    out.extend_from_slice(&kb[iv_base + iv..iv_base + 2 * iv]);
    out.extend_from_slice(&kb[iv_base..iv_base + iv]);
    out
}

fn certificate_msg_tls13() -> Vec<u8> {
    let mut body = vec![0x00]; // empty certificate_request_context
    let mut list = Vec::new();
    for der in [LEAF, INTER] {
        list.extend_from_slice(&u24(der.len()));
        list.extend_from_slice(der);
        list.extend_from_slice(&[0x00, 0x00]); // no per-certificate extensions
    }
    body.extend_from_slice(&u24(list.len()));
    body.extend_from_slice(&list);
    hs_msg(0x0b, &body)
}

fn run_tls13_server(listener: TcpListener) {
    let (mut sock, _) = listener.accept().unwrap();
    let suite = &suites::TLS13_AES_256_GCM_SHA384;

    let (typ, ch) = read_record(&mut sock);
    assert_eq!(typ, 0x16);
    let info = parse_client_hello(&ch);
    assert_eq!(info.x25519_share.len(), 32);

    let mut transcript = HandshakeHash::new();
    transcript.update(&ch);
    transcript.pick(HashAlgorithm::SHA384);

    let mut seed = [0u8; 64];
    for (i, b) in seed.iter_mut().enumerate() {
        *b = 0x42 ^ i as u8;
    }
    let kx = KeyPairs::generate(&seed).unwrap();
    let server_share = kx.public_key(NamedGroup::X25519).unwrap();
    let shared = kx
        .shared_secret(NamedGroup::X25519, &info.x25519_share)
        .unwrap();

    // ServerHello: our random, the chosen suite, supported_versions
    // and our key share.
    let mut body = Vec::new();
    body.extend_from_slice(&[0x03, 0x03]);
    body.extend_from_slice(&[0x5a; 32]);
    body.push(0);
    body.extend_from_slice(&0x1302u16.to_be_bytes());
    body.push(0);
    let mut exts = Vec::new();
    exts.extend_from_slice(&[0x00, 0x2b, 0x00, 0x02, 0x03, 0x04]);
    exts.extend_from_slice(&[0x00, 0x33]);
    exts.extend_from_slice(&((server_share.len() + 4) as u16).to_be_bytes());
    exts.extend_from_slice(&[0x00, 0x1d]);
    exts.extend_from_slice(&(server_share.len() as u16).to_be_bytes());
    exts.extend_from_slice(&server_share);
    body.extend_from_slice(&(exts.len() as u16).to_be_bytes());
    body.extend_from_slice(&exts);
    let sh = hs_msg(0x02, &body);
    transcript.update(&sh);
    write_record(&mut sock, 0x16, &sh);

    let mut ks = KeySchedule::new(HashAlgorithm::SHA384);
    ks.input_empty();
    ks.input_secret(&shared);
    let hs_hash = transcript.current();
    let c_hs = ks.derive(SecretKind::ClientHandshakeTrafficSecret, &hs_hash);
    let s_hs = ks.derive(SecretKind::ServerHandshakeTrafficSecret, &hs_hash);
    // Swapped construction: this cipher's write half is the server's.
    let hs_cipher = MessageCipher::new_tls13(suite, &s_hs, &c_hs);
    let mut write_seq = 0u64;

    // Compatibility ChangeCipherSpec, which the client must ignore.
    write_record(&mut sock, 0x14, &[0x01]);

    // EncryptedExtensions and the front half of Certificate share a
    // record; the rest of Certificate follows in a second one.  The
    // client has to both split and join.
    let ee = hs_msg(0x08, &[0x00, 0x00]);
    transcript.update(&ee);
    let cert = certificate_msg_tls13();
    transcript.update(&cert);
    let mut first = ee.clone();
    first.extend_from_slice(&cert[..200]);
    send_encrypted(
        &hs_cipher,
        &mut write_seq,
        &mut sock,
        ContentType::Handshake,
        &first,
    );
    send_encrypted(
        &hs_cipher,
        &mut write_seq,
        &mut sock,
        ContentType::Handshake,
        &cert[200..],
    );

    // CertificateVerify under the leaf key.
    let message = tls13_verify_bytes(&transcript.current());
    let sig: p256::ecdsa::Signature = leaf_signer().sign(&message);
    let sig = sig.to_der();
    let mut cv_body = vec![0x04, 0x03];
    cv_body.extend_from_slice(&(sig.as_bytes().len() as u16).to_be_bytes());
    cv_body.extend_from_slice(sig.as_bytes());
    let cv = hs_msg(0x0f, &cv_body);
    transcript.update(&cv);
    send_encrypted(
        &hs_cipher,
        &mut write_seq,
        &mut sock,
        ContentType::Handshake,
        &cv,
    );

    // Server Finished.
    let fin_verify = ks.sign_verify_data(&s_hs, &transcript.current());
    let fin = hs_msg(0x14, &fin_verify);
    transcript.update(&fin);
    send_encrypted(
        &hs_cipher,
        &mut write_seq,
        &mut sock,
        ContentType::Handshake,
        &fin,
    );

    // Application secrets cover the transcript through our Finished.
    ks.input_empty();
    let ap_hash = transcript.current();
    let c_ap = ks.derive(SecretKind::ClientApplicationTrafficSecret, &ap_hash);
    let s_ap = ks.derive(SecretKind::ServerApplicationTrafficSecret, &ap_hash);
    let mut app_cipher = MessageCipher::new_tls13(suite, &s_ap, &c_ap);

    // Client compatibility CCS, then its Finished under the handshake
    // keys.
    let (typ, payload) = read_record(&mut sock);
    assert_eq!((typ, payload.as_slice()), (0x14, &[0x01][..]));
    let mut read_seq = 0u64;
    let (inner, plain) = recv_encrypted(&hs_cipher, &mut read_seq, &mut sock);
    assert_eq!(inner, ContentType::Handshake);
    assert_eq!(plain[0], 0x14);
    let expect = ks.sign_verify_data(&c_hs, &transcript.current());
    assert_eq!(&plain[4..], expect.as_slice());

    // Application phase.  First the client speaks.
    let mut app_read_seq = 0u64;
    let mut app_write_seq = 0u64;
    let (inner, hello) = recv_encrypted(&app_cipher, &mut app_read_seq, &mut sock);
    assert_eq!(inner, ContentType::ApplicationData);
    assert_eq!(hello, b"hello world");

    // A session ticket the client must skip.
    let mut nst_body = Vec::new();
    nst_body.extend_from_slice(&3600u32.to_be_bytes());
    nst_body.extend_from_slice(&0u32.to_be_bytes());
    nst_body.extend_from_slice(&[0x01, 0x00]); // one-byte nonce
    nst_body.extend_from_slice(&[0x00, 0x05]);
    nst_body.extend_from_slice(b"tckt!");
    nst_body.extend_from_slice(&[0x00, 0x00]);
    let nst = hs_msg(0x04, &nst_body);
    send_encrypted(
        &app_cipher,
        &mut app_write_seq,
        &mut sock,
        ContentType::Handshake,
        &nst,
    );

    // Demand a key update, then speak under the next generation.
    let ku = hs_msg(0x18, &[0x01]);
    send_encrypted(
        &app_cipher,
        &mut app_write_seq,
        &mut sock,
        ContentType::Handshake,
        &ku,
    );
    let s_ap = derive_next_secret(HashAlgorithm::SHA384, &s_ap);
    app_cipher.rekey_write(suite, &s_ap);
    app_write_seq = 0;
    send_encrypted(
        &app_cipher,
        &mut app_write_seq,
        &mut sock,
        ContentType::ApplicationData,
        &hello,
    );

    // The client answers with its own key update and rotates.
    let (inner, plain) = recv_encrypted(&app_cipher, &mut app_read_seq, &mut sock);
    assert_eq!(inner, ContentType::Handshake);
    assert_eq!(plain, vec![0x18, 0x00, 0x00, 0x01, 0x00]);
    let c_ap = derive_next_secret(HashAlgorithm::SHA384, &c_ap);
    app_cipher.rekey_read(suite, &c_ap);
    app_read_seq = 0;

    let (inner, bye) = recv_encrypted(&app_cipher, &mut app_read_seq, &mut sock);
    assert_eq!(inner, ContentType::ApplicationData);
    assert_eq!(bye, b"goodbye");
    send_encrypted(
        &app_cipher,
        &mut app_write_seq,
        &mut sock,
        ContentType::ApplicationData,
        &bye,
    );

    // Orderly shutdown from both sides.
    let (inner, alert) = recv_encrypted(&app_cipher, &mut app_read_seq, &mut sock);
    assert_eq!(inner, ContentType::Alert);
    assert_eq!(alert, vec![0x01, 0x00]);
    send_encrypted(
        &app_cipher,
        &mut app_write_seq,
        &mut sock,
        ContentType::Alert,
        &[0x01, 0x00],
    );
}

#[test]
fn tls13_handshake_and_session() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || run_tls13_server(listener));

    let mut roots = RootCertStore::empty();
    roots.add(ROOT).unwrap();
    let mut stats = NegotiatedStats::default();

    let mut sock = TcpStream::connect(addr).unwrap();
    let mut config = ClientConfig::new("test.example.com", &roots);
    config.stats = Some(&mut stats);
    config.now_unix = Some(NOW);
    let mut sess = ClientSession::handshake(config, &mut sock).unwrap();

    assert_eq!(stats.version, ProtocolVersion::TLSv1_3);
    assert_eq!(stats.cipher_suite, CipherSuite::TLS13_AES_256_GCM_SHA384);
    assert_eq!(stats.named_group, NamedGroup::X25519);
    assert_eq!(stats.signature_scheme, SignatureScheme::ECDSA_NISTP256_SHA256);
    assert_eq!(sess.version(), ProtocolVersion::TLSv1_3);

    sess.write(&mut sock, b"hello world").unwrap();
    // The echo arrives behind a session ticket and a key update, both
    // of which the session must absorb on its own.
    let got = sess.read(&mut sock).unwrap().unwrap().to_vec();
    assert_eq!(got, b"hello world");

    sess.write(&mut sock, b"goodbye").unwrap();
    let got = sess.read(&mut sock).unwrap().unwrap().to_vec();
    assert_eq!(got, b"goodbye");

    sess.send_close_notify(&mut sock).unwrap();
    assert!(sess.read(&mut sock).unwrap().is_none());

    server.join().unwrap();
}

fn run_tls12_server(listener: TcpListener) {
    let (mut sock, _) = listener.accept().unwrap();
    run_tls12_server_on(
        &mut sock,
        &suites::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        false,
    );
}

#[test]
fn tls12_handshake_and_session() {
    static SUITES: [&SupportedCipherSuite; 1] =
        [&suites::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256];

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || run_tls12_server(listener));

    let mut roots = RootCertStore::empty();
    roots.add(ROOT).unwrap();
    let mut stats = NegotiatedStats::default();

    let mut sock = TcpStream::connect(addr).unwrap();
    let mut config = ClientConfig::new("test.example.com", &roots);
    config.cipher_suites = &SUITES;
    config.stats = Some(&mut stats);
    config.now_unix = Some(NOW);
    let mut sess = ClientSession::handshake(config, &mut sock).unwrap();

    assert_eq!(stats.version, ProtocolVersion::TLSv1_2);
    assert_eq!(
        stats.cipher_suite,
        CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
    );
    assert_eq!(stats.named_group, NamedGroup::X25519);
    assert_eq!(stats.signature_scheme, SignatureScheme::ECDSA_NISTP256_SHA256);
    assert_eq!(sess.version(), ProtocolVersion::TLSv1_2);

    sess.write(&mut sock, b"ping tls12").unwrap();
    let got = sess.read(&mut sock).unwrap().unwrap().to_vec();
    assert_eq!(got, b"ping tls12");

    sess.send_close_notify(&mut sock).unwrap();
    assert!(sess.read(&mut sock).unwrap().is_none());

    server.join().unwrap();
}

#[test]
fn tls12_flipped_server_finished_is_rejected() {
    static SUITES: [&SupportedCipherSuite; 1] =
        [&suites::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256];

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (mut sock, _) = listener.accept().unwrap();
        run_tls12_server_on(&mut sock, &suites::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256, true);
    });

    let mut roots = RootCertStore::empty();
    roots.add(ROOT).unwrap();
    let mut sock = TcpStream::connect(addr).unwrap();
    let mut config = ClientConfig::new("test.example.com", &roots);
    config.cipher_suites = &SUITES;
    config.now_unix = Some(NOW);

    assert!(matches!(
        ClientSession::handshake(config, &mut sock),
        Err(tlsmith::TlsError::DecryptError)
    ));
    server.join().unwrap();
}

#[test]
fn stream_adapter_copies_in_and_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || run_tls12_server(listener));

    static SUITES: [&SupportedCipherSuite; 1] =
        [&suites::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256];

    let mut roots = RootCertStore::empty();
    roots.add(ROOT).unwrap();
    let mut sock = TcpStream::connect(addr).unwrap();
    let mut config = ClientConfig::new("test.example.com", &roots);
    config.cipher_suites = &SUITES;
    config.now_unix = Some(NOW);
    let mut sess = ClientSession::handshake(config, &mut sock).unwrap();

    let mut stream = tlsmith::Stream::new(&mut sess, &mut sock);
    stream.write_all(b"ping tls12").unwrap();

    // Read through the io adapter in deliberately tiny chunks.
    let mut got = Vec::new();
    let mut chunk = [0u8; 3];
    loop {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        got.extend_from_slice(&chunk[..n]);
        if got.len() == 10 {
            break;
        }
    }
    assert_eq!(got, b"ping tls12");

    sess.send_close_notify(&mut sock).unwrap();
    server.join().unwrap();
}

// The whole 1.2 script: handshake, one echo, orderly shutdown.  With
// `corrupt_finished` the Finished MAC is damaged before encryption and
// the script stops there.
fn run_tls12_server_on(
    sock: &mut TcpStream,
    suite: &'static SupportedCipherSuite,
    corrupt_finished: bool,
) {
    let (typ, ch) = read_record(sock);
    assert_eq!(typ, 0x16);
    let info = parse_client_hello(&ch);

    let mut transcript = HandshakeHash::new();
    transcript.update(&ch);
    transcript.pick(HashAlgorithm::SHA256);

    let server_random = [0x77u8; 32];
    let mut body = Vec::new();
    body.extend_from_slice(&[0x03, 0x03]);
    body.extend_from_slice(&server_random);
    body.push(0);
    body.extend_from_slice(&suite.suite.get_u16().to_be_bytes());
    body.push(0);
    let sh = hs_msg(0x02, &body);
    transcript.update(&sh);
    write_record(sock, 0x16, &sh);

    let mut cert_body = Vec::new();
    let mut list = Vec::new();
    for der in [LEAF, INTER] {
        list.extend_from_slice(&u24(der.len()));
        list.extend_from_slice(der);
    }
    cert_body.extend_from_slice(&u24(list.len()));
    cert_body.extend_from_slice(&list);
    let cert = hs_msg(0x0b, &cert_body);
    transcript.update(&cert);

    let mut seed = [0u8; 64];
    for (i, b) in seed.iter_mut().enumerate() {
        *b = 0x63 ^ i as u8;
    }
    let kx = KeyPairs::generate(&seed).unwrap();
    let server_share = kx.public_key(NamedGroup::X25519).unwrap();
    let message = tls12_kx_verify_bytes(
        &info.random,
        &server_random,
        NamedGroup::X25519,
        &server_share,
    );
    let sig: p256::ecdsa::Signature = leaf_signer().sign(&message);
    let sig = sig.to_der();
    let mut skx_body = vec![0x03, 0x00, 0x1d];
    skx_body.push(server_share.len() as u8);
    skx_body.extend_from_slice(&server_share);
    skx_body.extend_from_slice(&[0x04, 0x03]);
    skx_body.extend_from_slice(&(sig.as_bytes().len() as u16).to_be_bytes());
    skx_body.extend_from_slice(sig.as_bytes());
    let skx = hs_msg(0x0c, &skx_body);
    transcript.update(&skx);

    let shd = hs_msg(0x0e, &[]);
    transcript.update(&shd);

    let mut flight = cert.clone();
    flight.extend_from_slice(&skx);
    flight.extend_from_slice(&shd);
    write_record(sock, 0x16, &flight);

    let (typ, cke) = read_record(sock);
    assert_eq!(typ, 0x16);
    transcript.update(&cke);
    let mut r = Reader::init(&cke);
    assert_eq!(read_u8(&mut r), Some(0x10));
    read_u24(&mut r).unwrap();
    let client_share = r.take_vec_u8().unwrap();
    let shared = kx
        .shared_secret(NamedGroup::X25519, client_share)
        .unwrap();

    let secrets = SessionSecrets::new(
        &info.random,
        &server_random,
        HashAlgorithm::SHA256,
        &shared,
    );
    let key_block = secrets.make_key_block(suite.key_block_len());
    let cipher = MessageCipher::new_tls12(suite, &swapped_key_block(suite, &key_block), fill_random);

    let (typ, payload) = read_record(sock);
    assert_eq!((typ, payload.as_slice()), (0x14, &[0x01][..]));
    let mut read_seq = 0u64;
    let (inner, plain) = recv_encrypted(&cipher, &mut read_seq, sock);
    assert_eq!(inner, ContentType::Handshake);
    assert_eq!(plain[..4], [0x14, 0x00, 0x00, 0x0c]);
    let expect = secrets.client_verify_data(&transcript.current());
    assert_eq!(&plain[4..], &expect[..]);
    transcript.update(&plain);

    write_record(sock, 0x14, &[0x01]);
    let mut verify_data = secrets.server_verify_data(&transcript.current());
    if corrupt_finished {
        verify_data[0] ^= 0x01;
    }
    let fin = hs_msg(0x14, &verify_data);
    let mut write_seq = 0u64;
    send_encrypted(&cipher, &mut write_seq, sock, ContentType::Handshake, &fin);
    if corrupt_finished {
        return;
    }

    let (inner, ping) = recv_encrypted(&cipher, &mut read_seq, sock);
    assert_eq!(inner, ContentType::ApplicationData);
    assert_eq!(ping, b"ping tls12");
    send_encrypted(
        &cipher,
        &mut write_seq,
        sock,
        ContentType::ApplicationData,
        &ping,
    );

    let (inner, alert) = recv_encrypted(&cipher, &mut read_seq, sock);
    assert_eq!(inner, ContentType::Alert);
    assert_eq!(alert, vec![0x01, 0x00]);
    send_encrypted(
        &cipher,
        &mut write_seq,
        sock,
        ContentType::Alert,
        &[0x01, 0x00],
    );
}
