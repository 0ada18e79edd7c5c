//! Printable HTML documents. Each renderer takes a report model and returns a
//! standalone page that opens the print dialog once loaded.

use crate::matrix::month_abbreviation;
use crate::reports::{ManagementReport, PaymentMatrixReport, PrintedCell};
use chrono::{Local, NaiveDateTime};

const PRINT_SCRIPT: &str = "<script>window.onload = function() { window.print(); }</script>";

const MATRIX_STYLE: &str = r#"
body { font-family: 'Inter', sans-serif; padding: 40px; color: #1e293b; }
.header { text-align: center; border-bottom: 2px solid #e2e8f0; padding-bottom: 20px; margin-bottom: 30px; }
.header h1 { margin: 0; color: #1e1b4b; font-size: 24px; }
.header p { margin: 5px 0; color: #64748b; font-size: 14px; }
.summary { display: grid; grid-template-columns: repeat(3, 1fr); gap: 20px; margin-bottom: 30px; }
.summary-card { background: #f8fafc; padding: 15px; border-radius: 10px; border: 1px solid #e2e8f0; }
.summary-card span { display: block; font-size: 11px; font-weight: bold; color: #94a3b8; text-transform: uppercase; }
.summary-card strong { font-size: 18px; color: #1e293b; }
table { width: 100%; border-collapse: collapse; font-size: 9px; }
th, td { border: 1px solid #e2e8f0; padding: 6px 4px; text-align: center; }
th { background: #f1f5f9; color: #475569; text-transform: uppercase; font-size: 8px; }
td:first-child, th:first-child { text-align: left; padding-left: 10px; min-width: 150px; }
.status-paid { color: #059669; font-weight: bold; }
.status-pending { color: #d97706; font-weight: bold; }
.status-empty { color: #cbd5e1; }
.payment-info { display: flex; flex-direction: column; align-items: center; gap: 2px; }
.payment-date { font-size: 7px; color: #64748b; font-weight: normal; }
.footer { margin-top: 50px; text-align: center; font-size: 12px; color: #94a3b8; border-top: 1px solid #e2e8f0; padding-top: 20px; }
.signature { margin: 40px auto 0; border-top: 1px solid #e2e8f0; width: 250px; padding-top: 10px; }
@media print {
  body { padding: 0; }
  @page { size: landscape; margin: 1cm; }
}
"#;

const MANAGEMENT_STYLE: &str = r#"
body { font-family: 'Inter', sans-serif; padding: 40px; color: #1e293b; }
.header { text-align: center; border-bottom: 2px solid #e2e8f0; padding-bottom: 20px; margin-bottom: 30px; }
.header h1 { margin: 0; color: #1e1b4b; font-size: 24px; }
.section { margin-bottom: 40px; }
.section h2 { font-size: 16px; color: #4338ca; border-left: 4px solid #4338ca; padding-left: 10px; margin-bottom: 20px; }
.grid { display: grid; grid-template-columns: repeat(3, 1fr); gap: 20px; margin-bottom: 30px; }
.card { background: #f8fafc; padding: 15px; border-radius: 10px; border: 1px solid #e2e8f0; }
.card span { display: block; font-size: 10px; font-weight: bold; color: #94a3b8; text-transform: uppercase; }
.card strong { font-size: 18px; color: #1e293b; }
table { width: 100%; border-collapse: collapse; font-size: 11px; margin-top: 10px; }
th, td { border: 1px solid #e2e8f0; padding: 10px; text-align: left; }
th { background: #f1f5f9; color: #475569; }
.footer { margin-top: 50px; text-align: center; font-size: 12px; color: #94a3b8; }
@page { margin: 2cm; }
"#;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn money(amount: f64) -> String {
    format!("R$ {amount:.2}")
}

fn timestamp(at: NaiveDateTime) -> String {
    at.format("%d/%m/%Y %H:%M:%S").to_string()
}

fn summary_card(class: &str, label: &str, value: &str) -> String {
    format!("<div class=\"{class}\"><span>{label}</span><strong>{value}</strong></div>")
}

fn matrix_cell(cell: &PrintedCell) -> String {
    let (class, label, date) = match cell {
        PrintedCell::Absent => return "<td class=\"status-empty\">-</td>".to_string(),
        PrintedCell::Paid { payment_date } => ("status-paid", "PAGO", payment_date),
        PrintedCell::Pending { payment_date } => ("status-pending", "PEND", payment_date),
    };
    format!(
        "<td class=\"{class}\"><div class=\"payment-info\"><span>{label}</span>\
         <span class=\"payment-date\">{}</span></div></td>",
        date.format("%d/%m")
    )
}

pub fn render_payment_matrix(report: &PaymentMatrixReport) -> String {
    let association = escape_html(&report.association_name);
    let year = report.year;

    let mut html = String::new();
    html.push_str(&format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <title>Relatório de Pagamentos - {year}</title><style>{MATRIX_STYLE}</style></head><body>"
    ));
    html.push_str(&format!(
        "<div class=\"header\"><h1>{association}</h1>\
         <p>Relatório Anual Detalhado de Pagamentos - Exercício {year}</p>\
         <p>Emitido em: {}</p></div>",
        timestamp(report.issued_at)
    ));

    html.push_str("<div class=\"summary\">");
    html.push_str(&summary_card(
        "summary-card",
        "Total de Associados Ativos",
        &report.active_members.to_string(),
    ));
    html.push_str(&summary_card(
        "summary-card",
        &format!("Arrecadação Total ({year})"),
        &money(report.total_collected),
    ));
    html.push_str(&summary_card(
        "summary-card",
        "Operador Responsável",
        &escape_html(&report.operator_name),
    ));
    html.push_str("</div>");

    html.push_str("<table><thead><tr><th>Associado</th>");
    for month in 0..12u8 {
        html.push_str(&format!("<th>{}</th>", month_abbreviation(month)));
    }
    html.push_str("</tr></thead><tbody>");
    for row in &report.rows {
        html.push_str(&format!(
            "<tr><td><strong>{}</strong></td>",
            escape_html(&row.name)
        ));
        for cell in &row.cells {
            html.push_str(&matrix_cell(cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");

    html.push_str(&format!(
        "<div class=\"footer\"><p>Este documento é para controle interno da {association}.</p>\
         <div class=\"signature\">Responsável pela Emissão</div></div>"
    ));
    html.push_str(PRINT_SCRIPT);
    html.push_str("</body></html>");
    html
}

pub fn render_management_report(report: &ManagementReport) -> String {
    let summary = &report.summary;
    let association = escape_html(&report.association_name);
    let year = summary.year;

    let mut html = String::new();
    html.push_str(&format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <title>Relatório Gerencial - {year}</title><style>{MANAGEMENT_STYLE}</style></head><body>"
    ));
    html.push_str(&format!(
        "<div class=\"header\"><h1>Relatório Gerencial de Atividades</h1>\
         <p>{association}</p>\
         <p>Ano de Referência: {year} | Emitido em: {}</p></div>",
        timestamp(report.issued_at)
    ));

    html.push_str("<div class=\"section\"><h2>Resumo Financeiro e Operacional</h2><div class=\"grid\">");
    html.push_str(&summary_card("card", "Arrecadação Anual", &money(summary.total_collected)));
    html.push_str(&summary_card("card", "Média Mensal", &money(summary.monthly_average)));
    html.push_str(&summary_card(
        "card",
        "Total Associados Ativos",
        &summary.status.active.to_string(),
    ));
    html.push_str(&summary_card(
        "card",
        "Associados Inativos",
        &summary.status.inactive.to_string(),
    ));
    html.push_str("</div></div>");

    html.push_str(
        "<div class=\"section\"><h2>Arrecadação por Mês</h2><table><thead><tr>\
         <th>Mês</th><th>Valor Arrecadado</th><th>Nº de Recebimentos</th></tr></thead><tbody>",
    );
    for month in &summary.monthly {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            month.label,
            money(month.total),
            month.count
        ));
    }
    html.push_str("</tbody></table></div>");

    html.push_str(
        "<div class=\"section\"><h2>Operadores com Mais Cadastros</h2><table><thead><tr>\
         <th>Operador</th><th>Associados Cadastrados</th></tr></thead><tbody>",
    );
    for operator in &summary.top_operators {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>",
            escape_html(&operator.name),
            operator.members
        ));
    }
    html.push_str("</tbody></table></div>");

    html.push_str(
        "<div class=\"section\"><h2>Log de Auditoria - Últimas Atividades</h2><table><thead><tr>\
         <th>Associado</th><th>Endereço Registrado</th><th>Operador Responsável</th><th>Data/Hora da Ação</th></tr></thead><tbody>",
    );
    for entry in &summary.recent_activity {
        let at = entry
            .at
            .map(|at| timestamp(at.with_timezone(&Local).naive_local()))
            .unwrap_or_else(|| "-".to_string());
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{at}</td></tr>",
            escape_html(&entry.member_name),
            escape_html(&entry.address),
            escape_html(entry.operator.as_deref().unwrap_or("-")),
        ));
    }
    html.push_str("</tbody></table></div>");

    html.push_str(&format!(
        "<div class=\"footer\"><p>Relatório emitido pelo Sistema de Gestão - {association}.</p></div>"
    ));
    html.push_str(PRINT_SCRIPT);
    html.push_str("</body></html>");
    html
}
