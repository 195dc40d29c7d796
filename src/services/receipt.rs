//! 打卡凭条解析
//!
//! 最终页面里 `table.table-condensed` 的两列行（标签 / 值）。

use crate::models::attendance::AttendanceReceipt;
use crate::services::html_scan::{self, text_content};

const RECEIPT_TABLE_CLASSES: &str = "table table-condensed";

/// 读取凭条表格的 (标签, 值) 行，保持文档顺序
fn receipt_rows(html: &str) -> Option<Vec<(String, String)>> {
    let html = html_scan::strip_comments(html);
    let table = html_scan::elements(&html, "table")
        .into_iter()
        .find(|(tag, _)| tag.has_classes(RECEIPT_TABLE_CLASSES))?;

    let rows = html_scan::elements(table.1, "tr")
        .into_iter()
        .filter_map(|(_, row)| {
            let cells: Vec<String> = html_scan::elements(row, "td")
                .into_iter()
                .map(|(_, cell)| text_content(cell).trim().to_string())
                .collect();
            match cells.as_slice() {
                [key, value] => Some((key.clone(), value.clone())),
                _ => None,
            }
        })
        .collect();
    Some(rows)
}

/// 解析凭条；没有凭条表格时返回 None
///
/// 表格中有两行 "Rut"：第一行是公司，第二行是员工。
pub fn extract_receipt(html: &str) -> Option<AttendanceReceipt> {
    let rows = receipt_rows(html)?;
    let mut receipt = AttendanceReceipt::default();
    let mut rut_seen = 0;

    for (key, value) in rows {
        let normalized = key.trim_end_matches(':').trim().to_lowercase();
        match normalized.as_str() {
            "empresa" => receipt.company = value,
            "rut" => {
                if rut_seen == 0 {
                    receipt.company_tax_id = value;
                } else {
                    receipt.employee_tax_id = value;
                }
                rut_seen += 1;
            }
            "dirección" | "direccion" => receipt.address = value,
            "nombre" => receipt.employee_name = value,
            "fecha" => receipt.date = value,
            "hora" => receipt.time = value,
            "opción" | "opcion" => receipt.option = value,
            "latitud registrada" => receipt.latitude = value,
            "longitud registrada" => receipt.longitude = value,
            "codigo hash" | "código hash" => receipt.hash_code = value,
            _ => {}
        }
    }

    Some(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECEIPT_PAGE: &str = r#"
<table class="table">
  <tr><td>Ignorada</td><td>x</td></tr>
</table>
<table class="table table-condensed">
  <tr><td>Empresa</td><td>ACME SAC</td></tr>
  <tr><td>Rut</td><td>20123456789</td></tr>
  <tr><td>Direcci&oacute;n</td><td>Av. Balta 123</td></tr>
  <tr><td>Nombre</td><td><b>ANA PEREZ</b></td></tr>
  <tr><td>Rut</td><td>77668171</td></tr>
  <tr><td>Fecha</td><td>05-03-2025</td></tr>
  <tr><td>Hora</td><td>08:00:12</td></tr>
  <tr><td>Opci&oacute;n</td><td>Entrada</td></tr>
  <tr><td>Latitud Registrada</td><td>-6.7711</td></tr>
  <tr><td>Longitud Registrada</td><td>-79.8431</td></tr>
  <tr><td>Codigo Hash</td><td>ab12cd</td></tr>
  <tr><td colspan="2">pie</td></tr>
</table>"#;

    #[test]
    fn test_extract_receipt() {
        let receipt = extract_receipt(RECEIPT_PAGE).unwrap();
        assert_eq!(receipt.company, "ACME SAC");
        assert_eq!(receipt.company_tax_id, "20123456789");
        assert_eq!(receipt.employee_tax_id, "77668171");
        assert_eq!(receipt.address, "Av. Balta 123");
        assert_eq!(receipt.employee_name, "ANA PEREZ");
        assert_eq!(receipt.option, "Entrada");
        assert_eq!(receipt.hash_code, "ab12cd");
    }

    #[test]
    fn test_missing_table() {
        assert!(extract_receipt("<p>Registrado</p>").is_none());
    }
}
