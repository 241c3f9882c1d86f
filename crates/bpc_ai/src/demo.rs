use bpc_core::domain::EvidenceSnippet;

/// Seed corpus mirroring the bank's policy knowledge base, for demos and
/// tests. Effective windows cover 2025-2027.
pub fn demo_policy_docs() -> Vec<EvidenceSnippet> {
    vec![
        EvidenceSnippet {
            doc_id: "KYC-001".to_string(),
            title: "Customer Onboarding KYC".to_string(),
            jurisdiction: "UAE".to_string(),
            effective_from: "2025-01-01".to_string(),
            effective_to: "2027-12-31".to_string(),
            text: "Customer onboarding requires Emirates ID, passport copy, proof of \
                   address, and source of funds documentation before account activation. \
                   Discrepancies in identity documents must be escalated to compliance."
                .to_string(),
        },
        EvidenceSnippet {
            doc_id: "FEE-002".to_string(),
            title: "Card Fees and Refunds".to_string(),
            jurisdiction: "UAE".to_string(),
            effective_from: "2025-01-01".to_string(),
            effective_to: "2027-12-31".to_string(),
            text: "Replacement card fees are AED 100. Disputed transaction refunds are \
                   processed within 14 business days after investigation. Annual fees \
                   are non-refundable once the card year has started."
                .to_string(),
        },
        EvidenceSnippet {
            doc_id: "PSD-101".to_string(),
            title: "EU Payment Services Disclosures".to_string(),
            jurisdiction: "EU".to_string(),
            effective_from: "2025-01-01".to_string(),
            effective_to: "2027-12-31".to_string(),
            text: "Payment service customers in the EU must receive pre-contractual \
                   disclosures under PSD2, including charges, exchange rates, and \
                   execution timeframes for cross-border transfers."
                .to_string(),
        },
        EvidenceSnippet {
            doc_id: "AML-201".to_string(),
            title: "US AML Monitoring".to_string(),
            jurisdiction: "US".to_string(),
            effective_from: "2025-01-01".to_string(),
            effective_to: "2027-12-31".to_string(),
            text: "Transaction monitoring alerts for US accounts follow BSA/AML \
                   thresholds. Structuring patterns and sanctions matches are routed \
                   to the sanctions desk for disposition."
                .to_string(),
        },
    ]
}
