use crate::models::{Company, Template};

pub const SYSTEM_PROMPT: &str =
    "Sei C-Recenzione, un assistente professionale per la generazione di richieste di recensioni di prodotti.";

// Full prompt sent to the backend: system line, blank line, instructions.
// Field order and wording are what the deployed model is tuned against.
pub fn build_prompt(company: &Company, template: &Template) -> String {
    let products = company.products.as_deref().unwrap_or("prodotti vari");
    let category = company.category.as_deref().unwrap_or("generale");
    let website = company.website.as_deref().unwrap_or("");

    format!(
        "{SYSTEM_PROMPT}\n\n\
Sei C-Recenzione, un sistema professionale di richiesta recensioni per prodotti.

Genera una richiesta di recensione personalizzata per un'azienda basandoti sui seguenti dati:
- Nome azienda: {name}
- Prodotti: {products}
- Categoria: {category}
- Sito web: {website}

Utilizza il seguente template come base e personalizzalo in modo appropriato:
---
{content}
---

Requisiti:
1. La richiesta deve essere professionale, convincente e in italiano corretto
2. Personalizza il messaggio con i dettagli specifici dell'azienda
3. Aggiungi un'introduzione formale e una chiusura cordiale
4. Evidenzia il valore della recensione per entrambe le parti
5. Mantieni un tono rispettoso e professionale
6. Non includere placeholder o testo generico che deve essere sostituito

Fornisci solo il testo della richiesta, senza commenti aggiuntivi.
",
        name = company.name,
        content = template.content,
    )
}

// Remove every exact occurrence of the submitted prompt, then trim.
// The prompt's own surrounding whitespace is ignored since the backend trims its reply.
pub fn strip_echo(raw: &str, prompt: &str) -> String {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return raw.trim().to_string();
    }
    raw.replace(prompt, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company() -> Company {
        Company {
            id: "co-1".into(),
            name: "Acme".into(),
            email: None,
            website: Some("https://acme.it".into()),
            products: Some("Cuffie wireless".into()),
            notes: None,
            category: Some("cat-1".into()),
        }
    }

    fn template() -> Template {
        Template {
            id: "tpl-1".into(),
            name: "Base".into(),
            content: "Gentile [Nome Azienda], ...".into(),
            category: None,
        }
    }

    #[test]
    fn prompt_embeds_every_field_in_order() {
        let prompt = build_prompt(&company(), &template());

        assert!(prompt.starts_with(SYSTEM_PROMPT));
        let positions: Vec<usize> = [
            "- Nome azienda: Acme",
            "- Prodotti: Cuffie wireless",
            "- Categoria: cat-1",
            "- Sito web: https://acme.it",
            "---\nGentile [Nome Azienda], ...\n---",
            "6. Non includere placeholder",
            "Fornisci solo il testo della richiesta",
        ]
        .iter()
        .map(|needle| prompt.find(needle).unwrap_or_else(|| panic!("missing {needle:?}")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn prompt_uses_defaults_for_missing_fields() {
        let mut bare = company();
        bare.products = None;
        bare.category = None;
        bare.website = None;
        let prompt = build_prompt(&bare, &template());

        assert!(prompt.contains("- Prodotti: prodotti vari\n"));
        assert!(prompt.contains("- Categoria: generale\n"));
        assert!(prompt.contains("- Sito web: \n"));
    }

    #[test]
    fn echoed_prompt_is_removed() {
        let prompt = build_prompt(&company(), &template());
        let raw = format!("{prompt}\n\nGentile Acme, ci farebbe piacere una sua recensione.  ");

        assert_eq!(strip_echo(&raw, &prompt), "Gentile Acme, ci farebbe piacere una sua recensione.");
    }

    #[test]
    fn partial_echo_is_left_alone() {
        let prompt = "Scrivi una richiesta.";
        assert_eq!(strip_echo("Scrivi una Gentile Acme", prompt), "Scrivi una Gentile Acme");
        assert_eq!(strip_echo("  plain text \n", prompt), "plain text");
    }
}
