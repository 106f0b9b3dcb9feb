//! Gateway response codes (`error` callback parameter).

use std::borrow::Cow;

/// Response code of an accepted payment.
pub const ACCEPTED: &str = "00000";

/// Prefix shared by every refusal issued by the authorization center
/// (`001xx`, where `xx` is the issuer's own reason code).
pub const AUTHORIZATION_REFUSED_PREFIX: &str = "001";

const AUTHORIZATION_REFUSED: &str = "Paiement refusé par le centre d’autorisation";

const MESSAGES: [(&str, &str); 18] = [
    ("00000", "Paiement accepté"),
    ("00001", "La connexion au centre d’autorisation a échoué ou une erreur interne est survenue"),
    ("00003", "Erreur Up2Pay"),
    ("00004", "Numéro de porteur ou cryptogramme visuel invalide."),
    ("00006", "Accès refusé ou site / rang incorrect"),
    ("00008", "Date de fin de validité incorrect"),
    ("00009", "Erreur de création d’un abonnement."),
    ("00010", "Devise inconnue"),
    ("00011", "Montant incorrect"),
    ("00015", "Paiement déjà effectué."),
    ("00016", "Abonne déjà existant"),
    ("00021", "Carte non autorisée"),
    ("00022", "Plafond atteint"),
    ("00029", "Carte non conforme"),
    (
        "00030",
        "Temps d'attente supérieur au délai maximal par l'internaute/acheteur au niveau de la page de paiements",
    ),
    ("00033", "Code pays de l'adresse IP du nbavigateur de l'acheteur non autorisé"),
    ("00040", "Opération sans authentification 3-D Secure, bloquée par le filtre."),
    ("00099", "Opération en attente de validation par l’émetteur du moyen de paiement."),
];

/// Returns the French message for a gateway response code.
///
/// Codes starting with `001` are refusals from the authorization center and
/// share one message. Unknown codes render as `Erreur {code}`.
///
/// # Examples
///
/// ```
/// use up2pay::codes::lookup_error_text;
///
/// assert_eq!(lookup_error_text("00021"), "Carte non autorisée");
/// assert_eq!(lookup_error_text("00100"), "Paiement refusé par le centre d’autorisation");
/// assert_eq!(lookup_error_text("0123131"), "Erreur 0123131");
/// ```
#[must_use]
pub fn lookup_error_text(code: &str) -> Cow<'static, str> {
    if code.starts_with(AUTHORIZATION_REFUSED_PREFIX) {
        return Cow::Borrowed(AUTHORIZATION_REFUSED);
    }

    MESSAGES
        .iter()
        .find(|(known, _)| *known == code)
        .map_or_else(|| Cow::Owned(format!("Erreur {code}")), |(_, text)| Cow::Borrowed(*text))
}
