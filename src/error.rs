use thiserror::Error;

/// Garde-fou sur les boucles bornées (avance de rotation, expansion de règles).
///
/// Dépasser la borne signale une configuration corrompue (longueur de shift
/// non positive, règle dégénérée), jamais une erreur transitoire : le résultat
/// n'est pas tronqué, l'appelant reçoit cette erreur.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invariant violated: {context} exceeded {limit} iterations")]
pub struct InvariantViolation {
    pub context: &'static str,
    pub limit: usize,
}

impl InvariantViolation {
    pub fn new(context: &'static str, limit: usize) -> Self {
        Self { context, limit }
    }
}

/// Compteur d'itérations qui lève [`InvariantViolation`] au-delà de `limit`.
#[derive(Debug)]
pub(crate) struct IterationGuard {
    context: &'static str,
    limit: usize,
    count: usize,
}

impl IterationGuard {
    pub(crate) fn new(context: &'static str, limit: usize) -> Self {
        Self {
            context,
            limit,
            count: 0,
        }
    }

    pub(crate) fn tick(&mut self) -> Result<(), InvariantViolation> {
        self.count += 1;
        if self.count > self.limit {
            return Err(InvariantViolation::new(self.context, self.limit));
        }
        Ok(())
    }
}
