//! X.509 and RSA key inspection.

use formation_core::{FormationError, Result};
use x509_parser::certificate::X509Certificate;
use x509_parser::der_parser::ber::BerObject;
use x509_parser::der_parser::parse_der;
use x509_parser::public_key::PublicKey;

/// `rsaEncryption`
const RSA_ENCRYPTION_OID: &str = "1.2.840.113549.1.1.1";

fn cert_error(e: impl std::fmt::Display) -> FormationError {
    FormationError::Certificate(e.to_string())
}

/// DER contents of every PEM block tagged `tag`
pub fn pem_blocks(pem_text: &[u8], tag: &str) -> Result<Vec<Vec<u8>>> {
    let blocks = pem::parse_many(pem_text).map_err(cert_error)?;
    Ok(blocks
        .into_iter()
        .filter(|p| p.tag() == tag)
        .map(pem::Pem::into_contents)
        .collect())
}

/// DER of the first certificate in a PEM document
pub fn first_certificate(pem_text: &[u8]) -> Result<Vec<u8>> {
    pem_blocks(pem_text, "CERTIFICATE")?
        .into_iter()
        .next()
        .ok_or_else(|| FormationError::Certificate("no certificate in PEM input".to_string()))
}

pub fn parse_certificate(der: &[u8]) -> Result<X509Certificate<'_>> {
    let (_, cert) = x509_parser::parse_x509_certificate(der).map_err(cert_error)?;
    Ok(cert)
}

/// Subject Common Name, if the certificate has one
pub fn common_name(der: &[u8]) -> Result<Option<String>> {
    let cert = parse_certificate(der)?;
    let cn = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_string);
    Ok(cn)
}

fn is_self_signed(cert: &X509Certificate<'_>) -> bool {
    cert.subject().as_raw() == cert.issuer().as_raw()
}

/// Check that `leaf` chains up to a self-signed certificate in `bundle`.
///
/// Each link is an issuer/subject name match whose signature verifies
/// against the issuer's key.
pub fn verify_chain(leaf: &[u8], bundle: &[Vec<u8>]) -> Result<()> {
    let leaf = parse_certificate(leaf)?;
    let authorities = bundle
        .iter()
        .map(|der| parse_certificate(der))
        .collect::<Result<Vec<_>>>()?;

    let mut current = &leaf;
    for _ in 0..=authorities.len() {
        let issuer = authorities.iter().find(|ca| {
            ca.subject().as_raw() == current.issuer().as_raw()
                && current.verify_signature(Some(ca.public_key())).is_ok()
        });

        match issuer {
            Some(ca) if is_self_signed(ca) => return Ok(()),
            Some(ca) => current = ca,
            None => break,
        }
    }

    Err(FormationError::Certificate(format!(
        "{} is not issued by the CA bundle",
        leaf.subject()
    )))
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// RSA modulus of a certificate's public key
pub fn certificate_modulus(der: &[u8]) -> Result<Vec<u8>> {
    let cert = parse_certificate(der)?;
    match cert.public_key().parsed().map_err(cert_error)? {
        PublicKey::RSA(rsa) => Ok(strip_leading_zeros(rsa.modulus).to_vec()),
        _ => Err(FormationError::Certificate("certificate key is not RSA".to_string())),
    }
}

fn sequence(der: &[u8]) -> Result<Vec<BerObject<'_>>> {
    let (_, object) = parse_der(der).map_err(cert_error)?;
    let items = object.as_sequence().map_err(cert_error)?;
    Ok(items.clone())
}

/// Modulus from a PKCS#1 `RSAPrivateKey`
fn pkcs1_modulus(der: &[u8]) -> Result<Vec<u8>> {
    let items = sequence(der)?;
    let modulus = items
        .get(1)
        .ok_or_else(|| FormationError::Certificate("truncated RSA private key".to_string()))?
        .as_slice()
        .map_err(cert_error)?;
    Ok(strip_leading_zeros(modulus).to_vec())
}

/// Modulus from a PKCS#8 `PrivateKeyInfo` wrapping an RSA key
fn pkcs8_modulus(der: &[u8]) -> Result<Vec<u8>> {
    let items = sequence(der)?;
    let (Some(algorithm), Some(private_key)) = (items.get(1), items.get(2)) else {
        return Err(FormationError::Certificate("truncated PKCS#8 private key".to_string()));
    };

    let oid = algorithm
        .as_sequence()
        .map_err(cert_error)?
        .first()
        .ok_or_else(|| FormationError::Certificate("private key has no algorithm".to_string()))?
        .as_oid()
        .map_err(cert_error)?
        .to_id_string();
    if oid != RSA_ENCRYPTION_OID {
        return Err(FormationError::Certificate(format!("private key algorithm {oid} is not RSA")));
    }

    pkcs1_modulus(private_key.as_slice().map_err(cert_error)?)
}

/// RSA modulus of a PEM private key, PKCS#1 or PKCS#8
pub fn key_modulus(key_pem: &[u8]) -> Result<Vec<u8>> {
    let block = pem::parse(key_pem).map_err(cert_error)?;
    match block.tag() {
        "RSA PRIVATE KEY" => pkcs1_modulus(block.contents()),
        "PRIVATE KEY" => pkcs8_modulus(block.contents()),
        other => Err(FormationError::Certificate(format!("unsupported private key type {other}"))),
    }
}

/// True if `key_pem` is the private half of the certificate's RSA key
pub fn key_matches_certificate(cert_der: &[u8], key_pem: &[u8]) -> Result<bool> {
    Ok(certificate_modulus(cert_der)? == key_modulus(key_pem)?)
}
