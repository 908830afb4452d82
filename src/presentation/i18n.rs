//! Interface strings per locale. Content strings come from the store.

use crate::domain::types::Locale;

#[derive(Debug)]
pub struct UiStrings {
    pub find_partner: &'static str,
    pub connect_with_expert: &'static str,
    pub agency_partners: &'static str,
    pub become_a_partner: &'static str,
    pub featured_partners: &'static str,
    pub stay_connected: &'static str,
    pub switch_language: &'static str,
    pub filter_all: &'static str,
    pub filter_apply: &'static str,
    pub industries: &'static str,
    pub specialties: &'static str,
    pub regions: &'static str,
    pub budgets: &'static str,
    pub no_partners: &'static str,
    pub visit_website: &'static str,
    pub read_more: &'static str,
    pub no_posts: &'static str,
    pub latest_posts: &'static str,
    pub written_by: &'static str,
    pub not_found_title: &'static str,
    pub not_found_message: &'static str,
    pub back_home: &'static str,
    pub consent_message: &'static str,
    pub consent_accept: &'static str,
    pub consent_decline: &'static str,
    pub draft_banner: &'static str,
    pub exit_draft: &'static str,
    pub submit: &'static str,
}

static EN: UiStrings = UiStrings {
    find_partner: "Find a SafeCircle Partner",
    connect_with_expert: "Connect with an expert to get the most out of SafeCircle.",
    agency_partners: "Agency Partners",
    become_a_partner: "Become a partner",
    featured_partners: "Featured Partners",
    stay_connected: "Stay connected",
    switch_language: "Switch language",
    filter_all: "All",
    filter_apply: "Filter",
    industries: "Industry",
    specialties: "Specialty",
    regions: "Region",
    budgets: "Budget",
    no_partners: "No partners match these filters.",
    visit_website: "Visit website",
    read_more: "Read more",
    no_posts: "Nothing has been published here yet.",
    latest_posts: "Latest updates",
    written_by: "Written by",
    not_found_title: "Page Not Found",
    not_found_message: "The page you requested does not exist.",
    back_home: "Back to home",
    consent_message: "We use privacy-friendly analytics to understand how the site is used.",
    consent_accept: "Accept",
    consent_decline: "Decline",
    draft_banner: "You are previewing draft content.",
    exit_draft: "Exit preview",
    submit: "Submit",
};

static ES: UiStrings = UiStrings {
    find_partner: "Encuentra un socio de SafeCircle",
    connect_with_expert: "Conecta con un experto para aprovechar SafeCircle al máximo.",
    agency_partners: "Agencias asociadas",
    become_a_partner: "Hazte socio",
    featured_partners: "Socios destacados",
    stay_connected: "Mantente conectado",
    switch_language: "Cambiar idioma",
    filter_all: "Todos",
    filter_apply: "Filtrar",
    industries: "Sector",
    specialties: "Especialidad",
    regions: "Región",
    budgets: "Presupuesto",
    no_partners: "Ningún socio coincide con estos filtros.",
    visit_website: "Visitar sitio web",
    read_more: "Leer más",
    no_posts: "Todavía no se ha publicado nada aquí.",
    latest_posts: "Últimas novedades",
    written_by: "Escrito por",
    not_found_title: "Página no encontrada",
    not_found_message: "La página que buscas no existe.",
    back_home: "Volver al inicio",
    consent_message: "Usamos analíticas respetuosas con la privacidad para entender cómo se usa el sitio.",
    consent_accept: "Aceptar",
    consent_decline: "Rechazar",
    draft_banner: "Estás viendo contenido en borrador.",
    exit_draft: "Salir de la vista previa",
    submit: "Enviar",
};

static FR: UiStrings = UiStrings {
    find_partner: "Trouver un partenaire SafeCircle",
    connect_with_expert: "Contactez un expert pour tirer le meilleur de SafeCircle.",
    agency_partners: "Agences partenaires",
    become_a_partner: "Devenir partenaire",
    featured_partners: "Partenaires à la une",
    stay_connected: "Restez connecté",
    switch_language: "Changer de langue",
    filter_all: "Tous",
    filter_apply: "Filtrer",
    industries: "Secteur",
    specialties: "Spécialité",
    regions: "Région",
    budgets: "Budget",
    no_partners: "Aucun partenaire ne correspond à ces filtres.",
    visit_website: "Visiter le site",
    read_more: "Lire la suite",
    no_posts: "Rien n'a encore été publié ici.",
    latest_posts: "Dernières actualités",
    written_by: "Écrit par",
    not_found_title: "Page introuvable",
    not_found_message: "La page demandée n'existe pas.",
    back_home: "Retour à l'accueil",
    consent_message: "Nous utilisons des statistiques respectueuses de la vie privée pour comprendre l'usage du site.",
    consent_accept: "Accepter",
    consent_decline: "Refuser",
    draft_banner: "Vous prévisualisez un brouillon.",
    exit_draft: "Quitter l'aperçu",
    submit: "Envoyer",
};

pub fn strings(locale: Locale) -> &'static UiStrings {
    match locale {
        Locale::En => &EN,
        Locale::Es => &ES,
        Locale::Fr => &FR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_locale_has_partner_strings() {
        for locale in Locale::ALL {
            assert!(!strings(locale).find_partner.is_empty());
        }
        assert_eq!(strings(Locale::En).find_partner, "Find a SafeCircle Partner");
    }
}
