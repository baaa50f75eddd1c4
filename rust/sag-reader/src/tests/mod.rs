mod catalogue_export;
