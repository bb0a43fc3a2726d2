use crate::error::TlsError;
use crate::msgs::codec::{read_u8, read_u16, Codec, Reader, Writer};

enum_builder! {@U16
    EnumName: ProtocolVersion;
    EnumVal {
        TLSv1_0 => 0x0301,
        TLSv1_2 => 0x0303,
        TLSv1_3 => 0x0304
    }
}

enum_builder! {@U8
    EnumName: ContentType;
    EnumVal {
        ChangeCipherSpec => 0x14,
        Alert => 0x15,
        Handshake => 0x16,
        ApplicationData => 0x17
    }
}

enum_builder! {@U8
    EnumName: HandshakeType;
    EnumVal {
        ClientHello => 0x01,
        ServerHello => 0x02,
        NewSessionTicket => 0x04,
        EncryptedExtensions => 0x08,
        Certificate => 0x0b,
        ServerKeyExchange => 0x0c,
        CertificateRequest => 0x0d,
        ServerHelloDone => 0x0e,
        CertificateVerify => 0x0f,
        ClientKeyExchange => 0x10,
        Finished => 0x14,
        KeyUpdate => 0x18
    }
}

enum_builder! {@U8
    EnumName: AlertLevel;
    EnumVal {
        Warning => 0x01,
        Fatal => 0x02
    }
}

enum_builder! {@U8
    EnumName: AlertDescription;
    EnumVal {
        CloseNotify => 0x00,
        UnexpectedMessage => 0x0a,
        BadRecordMac => 0x14,
        RecordOverflow => 0x16,
        HandshakeFailure => 0x28,
        BadCertificate => 0x2a,
        UnsupportedCertificate => 0x2b,
        CertificateRevoked => 0x2c,
        CertificateExpired => 0x2d,
        CertificateUnknown => 0x2e,
        IllegalParameter => 0x2f,
        UnknownCA => 0x30,
        AccessDenied => 0x31,
        DecodeError => 0x32,
        DecryptError => 0x33,
        ProtocolVersion => 0x46,
        InsufficientSecurity => 0x47,
        InternalError => 0x50,
        UserCanceled => 0x5a,
        MissingExtension => 0x6d,
        UnsupportedExtension => 0x6e,
        UnrecognisedName => 0x70,
        CertificateRequired => 0x74,
        NoApplicationProtocol => 0x78
    }
}

enum_builder! {@U16
    EnumName: CipherSuite;
    EnumVal {
        TLS_RSA_WITH_AES_128_CBC_SHA => 0x002f,
        TLS_RSA_WITH_AES_128_GCM_SHA256 => 0x009c,
        TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA => 0xc009,
        TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA => 0xc013,
        TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA => 0xc014,
        TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384 => 0xc028,
        TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 => 0xc02b,
        TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384 => 0xc02c,
        TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256 => 0xc02f,
        TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 => 0xc030,
        TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256 => 0xcca8,
        TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256 => 0xcca9,
        TLS13_AES_128_GCM_SHA256 => 0x1301,
        TLS13_AES_256_GCM_SHA384 => 0x1302,
        TLS13_CHACHA20_POLY1305_SHA256 => 0x1303
    }
}

enum_builder! {@U16
    EnumName: NamedGroup;
    EnumVal {
        secp256r1 => 0x0017,
        secp384r1 => 0x0018,
        X25519 => 0x001d,
        X25519Kyber768Draft00 => 0x6399
    }
}

enum_builder! {@U16
    EnumName: SignatureScheme;
    EnumVal {
        RSA_PKCS1_SHA1 => 0x0201,
        RSA_PKCS1_SHA256 => 0x0401,
        RSA_PKCS1_SHA384 => 0x0501,
        RSA_PKCS1_SHA512 => 0x0601,
        ECDSA_NISTP256_SHA256 => 0x0403,
        ECDSA_NISTP384_SHA384 => 0x0503,
        RSA_PSS_SHA256 => 0x0804,
        RSA_PSS_SHA384 => 0x0805,
        RSA_PSS_SHA512 => 0x0806,
        ED25519 => 0x0807
    }
}

enum_builder! {@U16
    EnumName: ExtensionType;
    EnumVal {
        ServerName => 0x0000,
        SupportedGroups => 0x000a,
        ECPointFormats => 0x000b,
        SignatureAlgorithms => 0x000d,
        SCT => 0x0012,
        SupportedVersions => 0x002b,
        PreSharedKey => 0x0029,
        KeyShare => 0x0033,
        RenegotiationInfo => 0xff01
    }
}

enum_builder! {@U8
    EnumName: ECPointFormat;
    EnumVal {
        Uncompressed => 0x00
    }
}

enum_builder! {@U8
    EnumName: ECCurveType;
    EnumVal {
        NamedCurve => 0x03
    }
}

enum_builder! {@U8
    EnumName: KeyUpdateRequest;
    EnumVal {
        UpdateNotRequested => 0x00,
        UpdateRequested => 0x01
    }
}

enum_builder! {@U8
    EnumName: HashAlgorithm;
    EnumVal {
        SHA256 => 0x04,
        SHA384 => 0x05
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn roundtrip_u8_enum() {
        let mut buf = [0u8; 4];
        let mut w = Writer::new(&mut buf);
        ContentType::Handshake.put(&mut w).unwrap();
        AlertLevel::Fatal.put(&mut w).unwrap();
        assert_eq!(w.bytes(), &[0x16, 0x02]);

        let mut r = Reader::init(&[0x16, 0x02, 0x63]);
        assert_eq!(ContentType::read(&mut r), Some(ContentType::Handshake));
        assert_eq!(AlertLevel::read(&mut r), Some(AlertLevel::Fatal));
        assert_eq!(ContentType::read(&mut r), Some(ContentType::Unknown(0x63)));
        assert_eq!(ContentType::read(&mut r), None);
    }

    #[test]
    fn roundtrip_u16_enum() {
        let mut buf = [0u8; 4];
        let mut w = Writer::new(&mut buf);
        CipherSuite::TLS13_AES_128_GCM_SHA256.put(&mut w).unwrap();
        NamedGroup::X25519.put(&mut w).unwrap();
        assert_eq!(w.bytes(), &[0x13, 0x01, 0x00, 0x1d]);

        let mut r = Reader::init(&[0x13, 0x01, 0x00, 0x1d]);
        assert_eq!(
            CipherSuite::read(&mut r),
            Some(CipherSuite::TLS13_AES_128_GCM_SHA256)
        );
        assert_eq!(NamedGroup::read(&mut r), Some(NamedGroup::X25519));
    }
}
