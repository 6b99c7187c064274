
mod reconcile;
