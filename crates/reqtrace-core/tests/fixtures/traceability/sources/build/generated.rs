// @req FR:other-feature/export.csv
