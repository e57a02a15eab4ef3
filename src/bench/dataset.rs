//! Built-in benchmark corpus.
//!
//! 200 Portuguese procurement queries, 50 per type, generated from subject and
//! template tables so every entry stays on the right side of the classifier
//! rules: simple entries are short and free of legal keywords, complex entries
//! are long and wordy but still keyword-free, legal entries always cite at
//! least one keyword. Every entry records the path it is expected to take;
//! the mixed set deliberately interleaves both.

use serde::{Deserialize, Serialize};

use crate::router::RetrievalPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Simple,
    Complex,
    Legal,
    Mixed,
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryType::Simple => write!(f, "simple"),
            QueryType::Complex => write!(f, "complex"),
            QueryType::Legal => write!(f, "legal"),
            QueryType::Mixed => write!(f, "mixed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkQuery {
    pub id: String,
    pub text: String,
    pub query_type: QueryType,
    /// Keywords expected in the retrieved context; drives the accuracy score.
    pub expected_keywords: Vec<String>,
    pub expected_path: RetrievalPath,
}

const QUERIES_PER_TYPE: usize = 50;

// Short price/supplier lookups. Must stay under the 50-char complexity
// threshold and avoid every legal keyword substring (so no "leilao",
// "edital", "portaria" and friends in subjects).
const SIMPLE_SUBJECTS: &[(&str, &str)] = &[
    ("notebook", "notebook"),
    ("cadeira giratoria", "cadeira"),
    ("papel sulfite", "sulfite"),
    ("toner de impressora", "toner"),
    ("cafe em graos", "cafe"),
    ("agua mineral", "agua"),
    ("monitor de video", "monitor"),
    ("teclado usb", "teclado"),
    ("mesa de escritorio", "mesa"),
    ("projetor portatil", "projetor"),
];

const SIMPLE_TEMPLATES: &[&str] = &[
    "preco de {}",
    "valor medio de {}",
    "quanto custa {}",
    "cotacao de {}",
    "fornecedor de {}",
];

// Process questions: keyword-free, but long and wordy enough that the
// length-based rules fire.
const COMPLEX_SUBJECTS: &[(&str, [&str; 2])] = &[
    ("compra direta de materiais", ["compra", "materiais"]),
    ("contratacao de servicos continuos", ["servicos", "continuos"]),
    ("renovacao de contratos de manutencao", ["contratos", "manutencao"]),
    ("aquisicao de equipamentos de informatica", ["equipamentos", "informatica"]),
    ("gestao de fornecedores cadastrados", ["fornecedores", "cadastrados"]),
    ("fiscalizacao de obras de engenharia", ["obras", "engenharia"]),
    ("recebimento de mercadorias importadas", ["mercadorias", "recebimento"]),
    ("pagamento de notas fiscais atrasadas", ["notas", "pagamento"]),
    ("planejamento anual de compras", ["planejamento", "compras"]),
    ("terceirizacao de servicos de limpeza", ["terceirizacao", "limpeza"]),
];

const COMPLEX_TEMPLATES: &[&str] = &[
    "como funciona o processo de {} e quais etapas devem ser seguidas pela equipe",
    "quais sao os requisitos para {} em orgaos publicos de pequeno porte",
    "explique detalhadamente o fluxo de {} desde o pedido ate a entrega final",
    "quais os riscos mais comuns em {} e como podem ser mitigados na pratica",
    "compare as vantagens e desvantagens de {} em cenarios de urgencia",
];

// Citations: each reference carries at least one legal keyword, so the
// keyword rule fires before any length rule.
const LEGAL_REFERENCES: &[(&str, [&str; 2])] = &[
    ("artigo 75 da lei 14133", ["artigo", "14133"]),
    ("artigo 24 da lei 8666", ["lei", "8666"]),
    ("decreto 10024 sobre pregao eletronico", ["decreto", "pregao"]),
    ("sumula 222 do tcu", ["sumula", "tcu"]),
    ("acordao 1234 do tcu", ["acordao", "tcu"]),
    ("inciso ii do artigo 74", ["inciso", "artigo"]),
    ("paragrafo unico do artigo 90", ["paragrafo", "artigo"]),
    ("edital de credenciamento de obras", ["edital", "obras"]),
    ("portaria 443 do ministerio da economia", ["portaria", "economia"]),
    ("instrucao normativa 65 sobre pesquisa de precos", ["instrucao normativa", "precos"]),
];

const LEGAL_TEMPLATES: &[&str] = &[
    "o que diz o {}",
    "qual o prazo previsto no {}",
    "quando se aplica o {}",
    "qual a penalidade prevista no {}",
    "como interpretar o {}",
];

// Mixed: half short lookups that should route to embeddings, half citations
// that should route to the tree search.
const MIXED_SIMPLE_SUBJECTS: &[(&str, &str)] = &[
    ("mouse sem fio", "mouse"),
    ("grampeador de mesa", "grampeador"),
    ("resma de papel", "resma"),
    ("garrafa termica", "garrafa"),
    ("cabo hdmi", "hdmi"),
];

const MIXED_SIMPLE_TEMPLATES: &[&str] = &[
    "preco atual de {}",
    "menor valor de {}",
    "marca comum de {}",
    "estoque minimo de {}",
    "custo unitario de {}",
];

const MIXED_LEGAL_REFERENCES: &[(&str, [&str; 2])] = &[
    ("artigo 18 da lei 14133", ["artigo", "14133"]),
    ("decreto 11462", ["decreto", "11462"]),
    ("sumula 473 do stf", ["sumula", "stf"]),
    ("acordao 2622 do tcu", ["acordao", "tcu"]),
    ("inciso iv do artigo 75", ["inciso", "artigo"]),
];

const MIXED_LEGAL_TEMPLATES: &[&str] = &[
    "explique o alcance do {}",
    "ha jurisprudencia recente sobre o {}",
    "quais orgaos aplicam o {}",
    "o {} ainda esta em vigor",
    "resuma os pontos centrais do {}",
];

fn fill(template: &str, subject: &str) -> String {
    template.replace("{}", subject)
}

/// The full 200-query corpus, in type order with sequential ids.
pub fn benchmark_corpus() -> Vec<BenchmarkQuery> {
    let mut queries = Vec::with_capacity(QUERIES_PER_TYPE * 4);

    let mut seq = 0usize;
    for template in SIMPLE_TEMPLATES {
        for (subject, keyword) in SIMPLE_SUBJECTS {
            seq += 1;
            queries.push(BenchmarkQuery {
                id: format!("simple-{:03}", seq),
                text: fill(template, subject),
                query_type: QueryType::Simple,
                expected_keywords: vec![keyword.to_string()],
                expected_path: RetrievalPath::Embeddings,
            });
        }
    }

    let mut seq = 0usize;
    for template in COMPLEX_TEMPLATES {
        for (subject, keywords) in COMPLEX_SUBJECTS {
            seq += 1;
            queries.push(BenchmarkQuery {
                id: format!("complex-{:03}", seq),
                text: fill(template, subject),
                query_type: QueryType::Complex,
                expected_keywords: keywords.iter().map(|k| k.to_string()).collect(),
                expected_path: RetrievalPath::PageIndex,
            });
        }
    }

    let mut seq = 0usize;
    for template in LEGAL_TEMPLATES {
        for (reference, keywords) in LEGAL_REFERENCES {
            seq += 1;
            queries.push(BenchmarkQuery {
                id: format!("legal-{:03}", seq),
                text: fill(template, reference),
                query_type: QueryType::Legal,
                expected_keywords: keywords.iter().map(|k| k.to_string()).collect(),
                expected_path: RetrievalPath::PageIndex,
            });
        }
    }

    let mut seq = 0usize;
    for template in MIXED_SIMPLE_TEMPLATES {
        for (subject, keyword) in MIXED_SIMPLE_SUBJECTS {
            seq += 1;
            queries.push(BenchmarkQuery {
                id: format!("mixed-{:03}", seq),
                text: fill(template, subject),
                query_type: QueryType::Mixed,
                expected_keywords: vec![keyword.to_string()],
                expected_path: RetrievalPath::Embeddings,
            });
        }
    }
    for template in MIXED_LEGAL_TEMPLATES {
        for (reference, keywords) in MIXED_LEGAL_REFERENCES {
            seq += 1;
            queries.push(BenchmarkQuery {
                id: format!("mixed-{:03}", seq),
                text: fill(template, reference),
                query_type: QueryType::Mixed,
                expected_keywords: keywords.iter().map(|k| k.to_string()).collect(),
                expected_path: RetrievalPath::PageIndex,
            });
        }
    }

    queries
}
