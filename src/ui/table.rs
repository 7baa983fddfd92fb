use crate::certificate::Certificate;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct CertificateRow {
    #[tabled(rename = "Serial")]
    pub serial: String,
    #[tabled(rename = "Signer")]
    pub signer: String,
    #[tabled(rename = "Components")]
    pub components: String,
    #[tabled(rename = "Expires")]
    pub expires: String,
}

impl From<&Certificate> for CertificateRow {
    fn from(cert: &Certificate) -> Self {
        Self {
            serial: cert.serial_number.clone(),
            signer: cert.signer.clone(),
            components: cert.components.join(", "),
            expires: cert
                .validity
                .map(|v| v.expiry_date.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

pub fn certificate_table(certs: &[Certificate]) -> String {
    if certs.is_empty() {
        return String::new();
    }

    let rows: Vec<CertificateRow> = certs.iter().map(CertificateRow::from).collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lists_every_certificate() {
        let certs = vec![
            Certificate::new("SN001", "AcmeCA", vec!["bootloader".to_string(), "kernel".to_string()]),
            Certificate::new("SN002", "OtherCA", vec!["fw".to_string()]),
        ];
        let table = certificate_table(&certs);
        assert!(table.contains("SN001"));
        assert!(table.contains("bootloader, kernel"));
        assert!(table.contains("OtherCA"));
        assert!(certificate_table(&[]).is_empty());
    }
}
